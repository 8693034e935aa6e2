//! SOCKS5 proxied dialer
//!
//! Opens a TCP connection to the proxy, applies socket options, and runs
//! the CONNECT handshake. The returned stream is tunneled to the target.

use super::{Dialer, LazyStream, ProxyEndpoint, SocketOpts};
use crate::config::ProxyConfig;
use crate::error::{SocksError, SocksPeerError};
use crate::socks::{Credential, SocksConnector, TargetAddr};
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpSocket, TcpStream};
use tracing::{debug, warn};

/// Default TCP connect timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default per-exchange handshake timeout
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Dialer that reaches every target through a SOCKS5 proxy
///
/// The proxy endpoint is fixed at construction. Only the proxy host is ever
/// resolved by this process; targets are forwarded verbatim.
#[derive(Debug, Clone)]
pub struct ProxiedDialer {
    proxy: ProxyEndpoint,
    connector: SocksConnector,
    socket_opts: SocketOpts,
    connect_timeout: Duration,
    local_addr: Option<SocketAddr>,
}

impl ProxiedDialer {
    /// Create a dialer for `proxy` without credentials
    pub fn new(proxy: ProxyEndpoint) -> Self {
        ProxiedDialer {
            proxy,
            connector: SocksConnector::new(None).with_read_timeout(DEFAULT_HANDSHAKE_TIMEOUT),
            socket_opts: SocketOpts::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            local_addr: None,
        }
    }

    /// Create a dialer from configuration
    pub fn from_config(config: &ProxyConfig) -> Result<Self, SocksPeerError> {
        let proxy = config.endpoint().map_err(SocksPeerError::Config)?;
        let credential = config.credential()?;

        let mut dialer = ProxiedDialer::new(proxy)
            .with_connect_timeout(config.connect_timeout())
            .with_handshake_timeout(config.handshake_timeout())
            .with_socket_opts(SocketOpts::from_tcp_config(&config.tcp));
        if let Some(credential) = credential {
            dialer = dialer.with_credential(credential);
        }
        if let Some(local_addr) = config.local_addr {
            dialer = dialer.with_local_addr(local_addr);
        }
        Ok(dialer)
    }

    /// Authenticate with username/password
    pub fn with_credential(mut self, credential: Credential) -> Self {
        let timeout = self.handshake_timeout();
        self.connector = SocksConnector::new(Some(credential)).with_read_timeout(timeout);
        self
    }

    /// Set the TCP connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the timeout applied to each handshake exchange
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.connector = self.connector.with_read_timeout(timeout);
        self
    }

    /// Bind this local address before connecting
    pub fn with_local_addr(mut self, addr: SocketAddr) -> Self {
        self.local_addr = Some(addr);
        self
    }

    /// Replace the socket options
    pub fn with_socket_opts(mut self, opts: SocketOpts) -> Self {
        self.socket_opts = opts;
        self
    }

    /// Proxy endpoint
    pub fn proxy(&self) -> &ProxyEndpoint {
        &self.proxy
    }

    /// TCP connect timeout
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Per-exchange handshake timeout
    pub fn handshake_timeout(&self) -> Duration {
        self.connector
            .read_timeout()
            .unwrap_or(DEFAULT_HANDSHAKE_TIMEOUT)
    }

    /// Open a tunneled stream to `target` with the configured settings
    pub async fn dial(&self, target: &TargetAddr) -> Result<TcpStream, SocksError> {
        self.dial_with(target, self.connect_timeout, self.local_addr)
            .await
    }

    /// Open a tunneled stream, overriding connect timeout and local address
    pub async fn dial_with(
        &self,
        target: &TargetAddr,
        connect_timeout: Duration,
        local_addr: Option<SocketAddr>,
    ) -> Result<TcpStream, SocksError> {
        let mut stream = self.connect_proxy(connect_timeout, local_addr).await?;
        self.connector.handshake(&mut stream, target).await?;
        Ok(stream)
    }

    /// Stream that dials `target` on first use
    pub fn lazy(&self, target: TargetAddr) -> LazyStream<ProxiedDialer> {
        LazyStream::new(Arc::new(self.clone()), target)
    }

    async fn connect_proxy(
        &self,
        connect_timeout: Duration,
        local_addr: Option<SocketAddr>,
    ) -> Result<TcpStream, SocksError> {
        let addrs = self.proxy.resolve().await.map_err(|e| self.dial_error(e))?;

        let mut last_err = None;
        for addr in addrs {
            match tokio::time::timeout(connect_timeout, connect_one(addr, local_addr)).await {
                Ok(Ok(stream)) => {
                    if let Err(e) = self.socket_opts.apply(&stream) {
                        warn!("Failed to set socket options on {}: {}", addr, e);
                    }
                    debug!("Connected to SOCKS5 proxy at {}", addr);
                    return Ok(stream);
                }
                Ok(Err(e)) => {
                    debug!("Connect to SOCKS5 proxy at {} failed: {}", addr, e);
                    last_err = Some(e);
                }
                Err(_) => {
                    debug!(
                        "Connect to SOCKS5 proxy at {} timed out after {:?}",
                        addr, connect_timeout
                    );
                    last_err = Some(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("connect timed out after {:?}", connect_timeout),
                    ));
                }
            }
        }

        Err(self.dial_error(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "proxy resolved to no addresses")
        })))
    }

    fn dial_error(&self, source: io::Error) -> SocksError {
        SocksError::Dial {
            proxy: self.proxy.to_string(),
            source,
        }
    }
}

async fn connect_one(addr: SocketAddr, local_addr: Option<SocketAddr>) -> io::Result<TcpStream> {
    match local_addr {
        Some(local) => {
            let socket = if addr.is_ipv4() {
                TcpSocket::new_v4()?
            } else {
                TcpSocket::new_v6()?
            };
            socket.bind(local)?;
            socket.connect(addr).await
        }
        None => TcpStream::connect(addr).await,
    }
}

#[async_trait]
impl Dialer for ProxiedDialer {
    type Stream = TcpStream;

    async fn dial(&self, target: &TargetAddr) -> Result<TcpStream, SocksError> {
        ProxiedDialer::dial(self, target).await
    }
}
