//! SOCKS5 client message codec
//!
//! Encoders and decoders for the four messages of the CONNECT handshake.
//! Everything here is pure except [`read_connect_reply`], which has to pull a
//! variable-length reply off the stream.
//!
//! # Message layouts
//!
//! ```text
//! greeting        VER NMETHODS METHODS...
//! greeting reply  VER METHOD
//! auth request    0x01 ULEN UNAME PLEN PASSWD
//! auth reply      0x01 STATUS
//! connect         VER CMD RSV ATYP DST.ADDR DST.PORT
//! connect reply   VER REP RSV ATYP BND.ADDR BND.PORT
//! ```

use super::consts::*;
use super::types::{AuthMethod, Credential, TargetAddr};
use crate::error::{ReplyCode, SocksError};
use bytes::{BufMut, Bytes, BytesMut};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

/// Decoded CONNECT reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectReply {
    /// Reply code
    pub code: ReplyCode,
    /// Address the proxy bound for the relay
    pub bound: TargetAddr,
}

/// Methods to offer: no-auth always, username/password when configured
pub fn offered_methods(credential: Option<&Credential>) -> Vec<AuthMethod> {
    let mut methods = vec![AuthMethod::None];
    if credential.is_some() {
        methods.push(AuthMethod::Password);
    }
    methods
}

/// Encode the method negotiation greeting
pub fn encode_greeting(methods: &[AuthMethod]) -> Bytes {
    let mut buf = BytesMut::with_capacity(2 + methods.len());
    buf.put_u8(SOCKS5_VERSION);
    buf.put_u8(methods.len() as u8);
    for method in methods {
        buf.put_u8(method.to_byte());
    }
    buf.freeze()
}

/// Decode the greeting reply and return the method the proxy picked
pub fn decode_greeting_reply(
    reply: [u8; 2],
    offered: &[AuthMethod],
) -> Result<AuthMethod, SocksError> {
    let [version, method] = reply;
    if version != SOCKS5_VERSION {
        return Err(SocksError::ProtocolMismatch {
            expected: SOCKS5_VERSION,
            actual: version,
        });
    }

    match AuthMethod::from_byte(method) {
        Some(selected) if offered.contains(&selected) => Ok(selected),
        _ => Err(SocksError::NoAcceptableAuthMethod(method)),
    }
}

/// Encode the RFC 1929 username/password request
pub fn encode_auth_request(credential: &Credential) -> Bytes {
    let username = credential.username();
    let password = credential.password();

    let mut buf = BytesMut::with_capacity(3 + username.len() + password.len());
    buf.put_u8(SOCKS5_AUTH_VERSION);
    buf.put_u8(username.len() as u8);
    buf.put_slice(username);
    buf.put_u8(password.len() as u8);
    buf.put_slice(password);
    buf.freeze()
}

/// Decode the RFC 1929 reply
pub fn decode_auth_reply(reply: [u8; 2]) -> Result<(), SocksError> {
    let [version, status] = reply;
    if version != SOCKS5_AUTH_VERSION || status != SOCKS5_AUTH_SUCCESS {
        return Err(SocksError::AuthenticationRejected { version, status });
    }
    Ok(())
}

/// Encode a CONNECT request for `target`
pub fn encode_connect_request(target: &TargetAddr) -> Result<Bytes, SocksError> {
    let mut buf = BytesMut::with_capacity(22);
    buf.put_u8(SOCKS5_VERSION);
    buf.put_u8(SOCKS5_CMD_TCP_CONNECT);
    buf.put_u8(SOCKS5_RESERVED);
    buf.put_u8(target.addr_type());

    match target {
        TargetAddr::Ip(SocketAddr::V4(addr)) => buf.put_slice(&addr.ip().octets()),
        TargetAddr::Ip(SocketAddr::V6(addr)) => buf.put_slice(&addr.ip().octets()),
        TargetAddr::Domain(domain, _) => {
            let host = domain.as_bytes();
            if host.is_empty() || host.len() > MAX_DOMAIN_LEN {
                return Err(SocksError::InvalidTarget(format!(
                    "domain length {} is outside 1..={}",
                    host.len(),
                    MAX_DOMAIN_LEN
                )));
            }
            buf.put_u8(host.len() as u8);
            buf.put_slice(host);
        }
    }

    buf.put_u16(target.port());
    Ok(buf.freeze())
}

/// Decode the fixed four-byte head of a CONNECT reply into `(code, atyp)`
pub fn decode_reply_header(header: [u8; 4]) -> Result<(ReplyCode, u8), SocksError> {
    let [version, code, _reserved, atyp] = header;
    if version != SOCKS5_VERSION {
        return Err(SocksError::ProtocolMismatch {
            expected: SOCKS5_VERSION,
            actual: version,
        });
    }
    Ok((ReplyCode::from(code), atyp))
}

/// Read an address of type `atyp` followed by its port
///
/// Consumes exactly 4, 16 or `1 + len` address bytes plus two port bytes.
pub async fn read_address<R>(reader: &mut R, atyp: u8) -> Result<TargetAddr, SocksError>
where
    R: AsyncRead + Unpin,
{
    let addr = match atyp {
        SOCKS5_ADDR_TYPE_IPV4 => {
            let mut ip = [0u8; 4];
            reader.read_exact(&mut ip).await?;
            let port = reader.read_u16().await?;
            TargetAddr::ipv4(Ipv4Addr::from(ip), port)
        }
        SOCKS5_ADDR_TYPE_IPV6 => {
            let mut ip = [0u8; 16];
            reader.read_exact(&mut ip).await?;
            let port = reader.read_u16().await?;
            TargetAddr::ipv6(Ipv6Addr::from(ip), port)
        }
        SOCKS5_ADDR_TYPE_DOMAIN => {
            let len = reader.read_u8().await? as usize;
            if len == 0 {
                return Err(SocksError::ProtocolDesync(
                    "zero-length domain in reply".to_string(),
                ));
            }
            let mut domain = vec![0u8; len];
            reader.read_exact(&mut domain).await?;
            let port = reader.read_u16().await?;
            TargetAddr::Domain(String::from_utf8_lossy(&domain).into_owned(), port)
        }
        other => {
            return Err(SocksError::ProtocolDesync(format!(
                "unknown address type {:#04x} in reply",
                other
            )))
        }
    };
    Ok(addr)
}

/// Read a complete CONNECT reply, bound address included
///
/// A failure reply whose trailing address is cut short still surfaces as
/// [`SocksError::Connect`] with the proxy's code.
pub async fn read_connect_reply<R>(reader: &mut R) -> Result<ConnectReply, SocksError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    reader.read_exact(&mut header).await?;
    let (code, atyp) = decode_reply_header(header)?;

    let bound = match read_address(reader, atyp).await {
        Ok(bound) => bound,
        Err(e) if code.is_success() => return Err(e),
        Err(e) => {
            trace!("Ignoring malformed bound address in failure reply: {}", e);
            return Err(SocksError::Connect(code));
        }
    };

    Ok(ConnectReply { code, bound })
}
