//! Proxy configuration types
//!
//! Describes how to reach the SOCKS5 proxy and how long to wait for it.

use super::TcpConfig;
use crate::dialer::ProxyEndpoint;
use crate::error::SocksError;
use crate::socks::Credential;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

fn default_proxy_addr() -> String {
    "127.0.0.1:9050".to_string()
}

/// Default TCP connect timeout in seconds
fn default_connect_timeout() -> u64 {
    60
}

/// Default handshake timeout in seconds
fn default_handshake_timeout() -> u64 {
    30
}

/// SOCKS5 proxy configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProxyConfig {
    /// Proxy address (e.g., "127.0.0.1:9050")
    #[serde(default = "default_proxy_addr")]
    pub addr: String,

    /// Username for SOCKS5 auth
    #[serde(default)]
    pub username: Option<String>,

    /// Password for SOCKS5 auth
    #[serde(default)]
    pub password: Option<String>,

    /// TCP connect timeout to the proxy, in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Timeout for each handshake exchange, in seconds
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout: u64,

    /// Local address to bind before connecting
    #[serde(default)]
    pub local_addr: Option<SocketAddr>,

    /// Socket options
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig {
            addr: default_proxy_addr(),
            username: None,
            password: None,
            connect_timeout: default_connect_timeout(),
            handshake_timeout: default_handshake_timeout(),
            local_addr: None,
            tcp: TcpConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Check if authentication credentials are configured
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Build the credential, if any
    pub fn credential(&self) -> Result<Option<Credential>, SocksError> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                Credential::new(username.as_bytes(), password.as_bytes()).map(Some)
            }
            (None, None) => Ok(None),
            _ => Err(SocksError::InvalidCredential(
                "username and password must be set together".to_string(),
            )),
        }
    }

    /// Parse the proxy endpoint
    pub fn endpoint(&self) -> Result<ProxyEndpoint, String> {
        self.addr.parse::<ProxyEndpoint>().map_err(|e| e.to_string())
    }

    /// TCP connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Handshake timeout
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.endpoint()?;
        self.credential().map_err(|e| e.to_string())?;
        if self.connect_timeout == 0 {
            return Err("connect_timeout must be greater than 0".to_string());
        }
        if self.handshake_timeout == 0 {
            return Err("handshake_timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}
