//! Proxy endpoint
//!
//! The proxy is the one host this process resolves itself. Targets are
//! never resolved here.

use crate::error::SocksPeerError;
use crate::socks::TargetAddr;
use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

/// Address of the SOCKS5 proxy
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyEndpoint {
    host: String,
    port: u16,
}

impl ProxyEndpoint {
    /// Create an endpoint from host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        ProxyEndpoint {
            host: host.into(),
            port,
        }
    }

    /// Proxy host
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Proxy port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolve the proxy to socket addresses
    ///
    /// IP literals are returned directly without a lookup.
    pub async fn resolve(&self) -> io::Result<Vec<SocketAddr>> {
        if let Ok(ip) = self.host.parse::<IpAddr>() {
            return Ok(vec![SocketAddr::new(ip, self.port)]);
        }

        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((self.host.as_str(), self.port))
            .await?
            .collect();
        if addrs.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("No addresses found for proxy {}", self),
            ));
        }
        Ok(addrs)
    }
}

impl FromStr for ProxyEndpoint {
    type Err = SocksPeerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let addr: TargetAddr = s.parse()?;
        Ok(ProxyEndpoint::new(addr.host(), addr.port()))
    }
}

impl From<SocketAddr> for ProxyEndpoint {
    fn from(addr: SocketAddr) -> Self {
        ProxyEndpoint::new(addr.ip().to_string(), addr.port())
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
