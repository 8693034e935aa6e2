//! Configuration module for socks-peer
//!
//! This module provides configuration types and TOML parsing for the proxy
//! dialer and for peer discovery.

mod discovery;
mod proxy;
mod tcp;

pub use discovery::DiscoveryConfig;
pub use proxy::ProxyConfig;
pub use tcp::TcpConfig;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// SOCKS5 proxy configuration
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Peer discovery configuration
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl Config {
    /// Validate every section
    pub fn validate(&self) -> Result<(), String> {
        self.proxy.validate()?;
        self.discovery.validate()?;
        Ok(())
    }
}

/// Load and validate configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

    let config = parse_config(&content)?;
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;
    Ok(config)
}

/// Parse configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse configuration")
}
