//! Dialer module for socks-peer
//!
//! This module provides the [`Dialer`] capability and its SOCKS5
//! implementation, [`ProxiedDialer`]. Callers depend on the trait and get
//! back a stream that is already tunneled to the target.

mod endpoint;
mod lazy;
mod proxied;

pub use endpoint::ProxyEndpoint;
pub use lazy::LazyStream;
pub use proxied::ProxiedDialer;

use crate::config::TcpConfig;
use crate::error::SocksError;
use crate::socks::TargetAddr;
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Socket options for the connection to the proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketOpts {
    /// Enable TCP_NODELAY
    pub nodelay: bool,
    /// TCP keepalive idle time in seconds
    pub keepalive_secs: Option<u64>,
    /// TCP keepalive interval in seconds
    pub keepalive_interval: Option<u64>,
}

impl Default for SocketOpts {
    fn default() -> Self {
        SocketOpts::from_tcp_config(&TcpConfig::default())
    }
}

impl SocketOpts {
    /// Create socket options from TCP config; a zero keepalive disables it
    pub fn from_tcp_config(config: &TcpConfig) -> Self {
        let keepalive_secs = (config.keepalive_secs > 0).then_some(config.keepalive_secs);
        SocketOpts {
            nodelay: config.nodelay,
            keepalive_secs,
            keepalive_interval: keepalive_secs.map(|_| config.keepalive_interval),
        }
    }

    /// Apply socket options to a TCP stream
    pub fn apply(&self, stream: &TcpStream) -> std::io::Result<()> {
        stream.set_nodelay(self.nodelay)?;

        if let (Some(timeout), Some(interval)) = (self.keepalive_secs, self.keepalive_interval) {
            let socket = socket2::SockRef::from(stream);
            let keepalive = socket2::TcpKeepalive::new()
                .with_time(Duration::from_secs(timeout))
                .with_interval(Duration::from_secs(interval));
            socket.set_tcp_keepalive(&keepalive)?;
        }

        Ok(())
    }
}

/// Capability to open a stream to a target
///
/// Implementations hide how the stream is obtained; the proxied
/// implementation runs a SOCKS5 handshake before returning.
#[async_trait]
pub trait Dialer: Debug + Send + Sync + 'static {
    /// The stream type produced by this dialer
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + Sync + Debug + 'static;

    /// Open a stream to `target`
    async fn dial(&self, target: &TargetAddr) -> Result<Self::Stream, SocksError>;
}

/// Object-safe form of [`Dialer`]
#[async_trait]
pub trait DialerDyn: Debug + Send + Sync {
    /// Open a stream to `target` and box it
    async fn dial_dyn(&self, target: &TargetAddr) -> Result<Box<dyn StreamDyn>, SocksError>;
}

#[async_trait]
impl<D: Dialer> DialerDyn for D {
    async fn dial_dyn(&self, target: &TargetAddr) -> Result<Box<dyn StreamDyn>, SocksError> {
        let stream = self.dial(target).await?;
        Ok(Box::new(stream))
    }
}

/// Dynamic stream trait for boxed streams
pub trait StreamDyn: AsyncRead + AsyncWrite + Unpin + Send + Sync + Debug {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + Sync + Debug> StreamDyn for T {}
