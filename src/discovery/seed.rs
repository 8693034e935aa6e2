//! Static seed list source
//!
//! Seeds are hidden-service style hostnames that only the proxy can reach.
//! They are returned as unresolved domain targets.

use super::Discovery;
use crate::config::DiscoveryConfig;
use crate::error::{DiscoveryError, SocksPeerError};
use crate::socks::TargetAddr;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

/// Discovery source over a fixed list of proxy-only seeds
#[derive(Debug)]
pub struct SeedOnionDiscovery {
    seeds: Vec<TargetAddr>,
    shut_down: AtomicBool,
}

impl SeedOnionDiscovery {
    /// Create a source from already-parsed targets
    pub fn new(seeds: Vec<TargetAddr>) -> Self {
        SeedOnionDiscovery {
            seeds,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Create a source from the `[discovery]` section
    pub fn from_config(config: &DiscoveryConfig) -> Result<Self, SocksPeerError> {
        Ok(SeedOnionDiscovery::new(config.seed_targets()?))
    }

    /// Configured seeds
    pub fn seeds(&self) -> &[TargetAddr] {
        &self.seeds
    }
}

#[async_trait]
impl Discovery for SeedOnionDiscovery {
    async fn get_peers(
        &self,
        services: u64,
        _timeout: Duration,
    ) -> Result<Vec<TargetAddr>, DiscoveryError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(DiscoveryError::ShutDown);
        }
        if services != 0 {
            return Err(DiscoveryError::UnsupportedFilter(services));
        }
        debug!("Returning {} seed peers", self.seeds.len());
        Ok(self.seeds.clone())
    }

    async fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::AcqRel) {
            debug!("Seed discovery shut down");
        }
    }
}
