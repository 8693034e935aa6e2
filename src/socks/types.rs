//! SOCKS5 type definitions
//!
//! Defines the target address, authentication method and credential types
//! used by the client handshake.

use super::consts::*;
use crate::error::{SocksError, SocksPeerError};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

/// Authentication methods offered by this client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// No authentication required
    None,
    /// Username/password authentication
    Password,
}

impl AuthMethod {
    /// Convert to SOCKS5 method byte
    pub fn to_byte(self) -> u8 {
        match self {
            AuthMethod::None => SOCKS5_AUTH_METHOD_NONE,
            AuthMethod::Password => SOCKS5_AUTH_METHOD_PASSWORD,
        }
    }

    /// Parse from SOCKS5 method byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_AUTH_METHOD_NONE => Some(AuthMethod::None),
            SOCKS5_AUTH_METHOD_PASSWORD => Some(AuthMethod::Password),
            _ => None,
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::None => write!(f, "no-auth"),
            AuthMethod::Password => write!(f, "username/password"),
        }
    }
}

/// Username/password pair for RFC 1929 sub-negotiation
///
/// Both fields are raw bytes of length 1 to 255.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    username: Vec<u8>,
    password: Vec<u8>,
}

impl Credential {
    /// Create a credential, checking the RFC 1929 length limits
    pub fn new(
        username: impl Into<Vec<u8>>,
        password: impl Into<Vec<u8>>,
    ) -> Result<Self, SocksError> {
        let username = username.into();
        let password = password.into();

        if username.is_empty() || username.len() > MAX_CREDENTIAL_LEN {
            return Err(SocksError::InvalidCredential(format!(
                "username length {} is outside 1..={}",
                username.len(),
                MAX_CREDENTIAL_LEN
            )));
        }
        if password.is_empty() || password.len() > MAX_CREDENTIAL_LEN {
            return Err(SocksError::InvalidCredential(format!(
                "password length {} is outside 1..={}",
                password.len(),
                MAX_CREDENTIAL_LEN
            )));
        }

        Ok(Credential { username, password })
    }

    /// Username bytes
    pub fn username(&self) -> &[u8] {
        &self.username
    }

    /// Password bytes
    pub fn password(&self) -> &[u8] {
        &self.password
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &String::from_utf8_lossy(&self.username))
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Destination of a CONNECT request
///
/// A domain is carried to the proxy as-is and never resolved locally; there
/// is deliberately no resolution method on this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetAddr {
    /// IP address with port
    Ip(SocketAddr),
    /// Domain name with port
    Domain(String, u16),
}

impl TargetAddr {
    /// Create a new TargetAddr from an IPv4 address and port
    pub fn ipv4(ip: Ipv4Addr, port: u16) -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V4(ip), port))
    }

    /// Create a new TargetAddr from an IPv6 address and port
    pub fn ipv6(ip: Ipv6Addr, port: u16) -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V6(ip), port))
    }

    /// Create a new TargetAddr from a domain name and port
    pub fn domain(domain: impl Into<String>, port: u16) -> Self {
        TargetAddr::Domain(domain.into(), port)
    }

    /// Build an unresolved target from a host string
    ///
    /// IP literals become [`TargetAddr::Ip`]; anything else is kept as a
    /// domain for the proxy to resolve.
    pub fn unresolved(host: &str, port: u16) -> Self {
        match host.parse::<IpAddr>() {
            Ok(ip) => TargetAddr::Ip(SocketAddr::new(ip, port)),
            Err(_) => TargetAddr::Domain(host.to_string(), port),
        }
    }

    /// Parse `host:port`, `[v6]:port`, or a bare host using `default_port`
    pub fn parse_with_default_port(
        s: &str,
        default_port: Option<u16>,
    ) -> Result<Self, SocksPeerError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SocksPeerError::InvalidAddress("empty address".to_string()));
        }

        if let Ok(addr) = s.parse::<SocketAddr>() {
            return Ok(TargetAddr::Ip(addr));
        }

        let (host, port) = split_host_port(s)?;
        if host.is_empty() {
            return Err(SocksPeerError::InvalidAddress(format!("missing host in {}", s)));
        }
        if host.len() > MAX_DOMAIN_LEN {
            return Err(SocksPeerError::InvalidAddress(format!(
                "host is {} bytes, limit is {}",
                host.len(),
                MAX_DOMAIN_LEN
            )));
        }

        let port = match port.or(default_port) {
            Some(port) => port,
            None => {
                return Err(SocksPeerError::InvalidAddress(format!(
                    "missing port in {}",
                    s
                )))
            }
        };

        Ok(TargetAddr::unresolved(host, port))
    }

    /// Get the host part as text
    pub fn host(&self) -> String {
        match self {
            TargetAddr::Ip(addr) => addr.ip().to_string(),
            TargetAddr::Domain(domain, _) => domain.clone(),
        }
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        match self {
            TargetAddr::Ip(addr) => addr.port(),
            TargetAddr::Domain(_, port) => *port,
        }
    }

    /// Get the address type byte for SOCKS5 protocol
    pub fn addr_type(&self) -> u8 {
        match self {
            TargetAddr::Ip(SocketAddr::V4(_)) => SOCKS5_ADDR_TYPE_IPV4,
            TargetAddr::Ip(SocketAddr::V6(_)) => SOCKS5_ADDR_TYPE_IPV6,
            TargetAddr::Domain(_, _) => SOCKS5_ADDR_TYPE_DOMAIN,
        }
    }

    /// Whether this target must be resolved by the proxy
    pub fn is_domain(&self) -> bool {
        matches!(self, TargetAddr::Domain(_, _))
    }
}

fn parse_port(s: &str, whole: &str) -> Result<u16, SocksPeerError> {
    s.parse::<u16>()
        .map_err(|_| SocksPeerError::InvalidAddress(format!("invalid port in {}", whole)))
}

fn split_host_port(s: &str) -> Result<(&str, Option<u16>), SocksPeerError> {
    if let Some(rest) = s.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| SocksPeerError::InvalidAddress(format!("unclosed bracket in {}", s)))?;
        if tail.is_empty() {
            return Ok((host, None));
        }
        let port = tail
            .strip_prefix(':')
            .ok_or_else(|| SocksPeerError::InvalidAddress(format!("garbage after ] in {}", s)))?;
        return Ok((host, Some(parse_port(port, s)?)));
    }

    match s.rsplit_once(':') {
        // A bare IPv6 literal has several colons and no port.
        Some((host, _)) if host.contains(':') => Ok((s, None)),
        Some((host, port)) => Ok((host, Some(parse_port(port, s)?))),
        None => Ok((s, None)),
    }
}

impl FromStr for TargetAddr {
    type Err = SocksPeerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetAddr::parse_with_default_port(s, None)
    }
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAddr::Ip(addr) => write!(f, "{}", addr),
            TargetAddr::Domain(domain, port) => write!(f, "{}:{}", domain, port),
        }
    }
}

impl From<SocketAddr> for TargetAddr {
    fn from(addr: SocketAddr) -> Self {
        TargetAddr::Ip(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_method_bytes() {
        assert_eq!(AuthMethod::None.to_byte(), SOCKS5_AUTH_METHOD_NONE);
        assert_eq!(AuthMethod::Password.to_byte(), SOCKS5_AUTH_METHOD_PASSWORD);
        assert_eq!(AuthMethod::from_byte(0x00), Some(AuthMethod::None));
        assert_eq!(AuthMethod::from_byte(0x02), Some(AuthMethod::Password));
        assert_eq!(AuthMethod::from_byte(0x01), None);
        assert_eq!(AuthMethod::from_byte(0xFF), None);
    }

    #[test]
    fn test_credential_limits() {
        assert!(Credential::new("user", "pass").is_ok());
        assert!(Credential::new(vec![b'u'; 255], vec![b'p'; 255]).is_ok());
        assert!(matches!(
            Credential::new("", "pass"),
            Err(SocksError::InvalidCredential(_))
        ));
        assert!(matches!(
            Credential::new("user", vec![b'p'; 256]),
            Err(SocksError::InvalidCredential(_))
        ));
    }

    #[test]
    fn test_credential_debug_redacts_password() {
        let cred = Credential::new("alice", "hunter2").unwrap();
        let debug = format!("{:?}", cred);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_target_addr_unresolved_keeps_domain() {
        let addr = TargetAddr::unresolved("example7onion.onion", 80);
        assert_eq!(addr, TargetAddr::domain("example7onion.onion", 80));
        assert!(addr.is_domain());
        assert_eq!(addr.addr_type(), SOCKS5_ADDR_TYPE_DOMAIN);
    }

    #[test]
    fn test_target_addr_unresolved_ip_literals() {
        let addr = TargetAddr::unresolved("10.0.0.1", 8333);
        assert_eq!(addr, TargetAddr::ipv4(Ipv4Addr::new(10, 0, 0, 1), 8333));

        let addr = TargetAddr::unresolved("::1", 8333);
        assert_eq!(addr.addr_type(), SOCKS5_ADDR_TYPE_IPV6);
    }

    #[test]
    fn test_target_addr_parse() {
        let addr: TargetAddr = "abc.onion:9999".parse().unwrap();
        assert_eq!(addr, TargetAddr::domain("abc.onion", 9999));

        let addr: TargetAddr = "127.0.0.1:9050".parse().unwrap();
        assert_eq!(addr, TargetAddr::ipv4(Ipv4Addr::LOCALHOST, 9050));

        let addr: TargetAddr = "[::1]:80".parse().unwrap();
        assert_eq!(addr, TargetAddr::ipv6(Ipv6Addr::LOCALHOST, 80));
    }

    #[test]
    fn test_target_addr_parse_default_port() {
        let addr = TargetAddr::parse_with_default_port("abc.onion", Some(17570)).unwrap();
        assert_eq!(addr, TargetAddr::domain("abc.onion", 17570));

        let addr = TargetAddr::parse_with_default_port("abc.onion:1", Some(17570)).unwrap();
        assert_eq!(addr.port(), 1);

        let addr = TargetAddr::parse_with_default_port("::1", Some(7)).unwrap();
        assert_eq!(addr, TargetAddr::ipv6(Ipv6Addr::LOCALHOST, 7));

        let addr = TargetAddr::parse_with_default_port("[::1]", Some(7)).unwrap();
        assert_eq!(addr, TargetAddr::ipv6(Ipv6Addr::LOCALHOST, 7));
    }

    #[test]
    fn test_target_addr_parse_errors() {
        assert!("".parse::<TargetAddr>().is_err());
        assert!("abc.onion".parse::<TargetAddr>().is_err());
        assert!("abc.onion:notaport".parse::<TargetAddr>().is_err());
        assert!("abc.onion:70000".parse::<TargetAddr>().is_err());
        assert!(":80".parse::<TargetAddr>().is_err());
        assert!("[::1".parse::<TargetAddr>().is_err());

        let long = format!("{}:80", "a".repeat(256));
        assert!(long.parse::<TargetAddr>().is_err());
    }

    #[test]
    fn test_target_addr_display() {
        let addr = TargetAddr::ipv4(Ipv4Addr::new(127, 0, 0, 1), 8080);
        assert_eq!(format!("{}", addr), "127.0.0.1:8080");
        assert_eq!(addr.host(), "127.0.0.1");

        let addr = TargetAddr::domain("test.onion", 443);
        assert_eq!(format!("{}", addr), "test.onion:443");
        assert_eq!(addr.host(), "test.onion");
    }
}
