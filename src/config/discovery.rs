//! Discovery configuration
//!
//! Seed addresses that are only reachable through the proxy.

use crate::error::SocksPeerError;
use crate::socks::TargetAddr;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default per-source discovery timeout in seconds
fn default_discovery_timeout() -> u64 {
    30
}

/// Peer discovery configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DiscoveryConfig {
    /// Seed hosts, `host` or `host:port`; never resolved locally
    #[serde(default)]
    pub seeds: Vec<String>,

    /// Port for seeds that do not carry one
    #[serde(default)]
    pub default_port: Option<u16>,

    /// Per-source timeout in seconds
    #[serde(default = "default_discovery_timeout")]
    pub timeout: u64,

    /// Service-bit filter passed to every source
    #[serde(default)]
    pub services: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        DiscoveryConfig {
            seeds: Vec::new(),
            default_port: None,
            timeout: default_discovery_timeout(),
            services: 0,
        }
    }
}

impl DiscoveryConfig {
    /// Parse the seed list into unresolved targets
    pub fn seed_targets(&self) -> Result<Vec<TargetAddr>, SocksPeerError> {
        self.seeds
            .iter()
            .map(|seed| TargetAddr::parse_with_default_port(seed, self.default_port))
            .collect()
    }

    /// Per-source timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.seed_targets().map_err(|e| e.to_string())?;
        if self.timeout == 0 {
            return Err("discovery timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}
