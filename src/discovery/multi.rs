//! Aggregating discovery source
//!
//! Sources are queried one after another. The first failure wins and no
//! partial list is returned, so total latency can reach the sum of the
//! per-source timeouts.

use super::Discovery;
use crate::error::DiscoveryError;
use crate::socks::TargetAddr;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Ordered composition of discovery sources
#[derive(Debug, Default, Clone)]
pub struct MultiDiscovery {
    sources: Vec<Arc<dyn Discovery>>,
}

impl MultiDiscovery {
    /// Create an aggregator over `sources`, queried in the given order
    pub fn new(sources: Vec<Arc<dyn Discovery>>) -> Self {
        MultiDiscovery { sources }
    }

    /// Append a source
    pub fn with_source(mut self, source: Arc<dyn Discovery>) -> Self {
        self.sources.push(source);
        self
    }

    /// Append a source in place
    pub fn push(&mut self, source: Arc<dyn Discovery>) {
        self.sources.push(source);
    }

    /// Number of sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether there are no sources
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[async_trait]
impl Discovery for MultiDiscovery {
    async fn get_peers(
        &self,
        services: u64,
        timeout: Duration,
    ) -> Result<Vec<TargetAddr>, DiscoveryError> {
        let mut peers = Vec::new();

        for (index, source) in self.sources.iter().enumerate() {
            let found = match tokio::time::timeout(timeout, source.get_peers(services, timeout)).await
            {
                Ok(Ok(found)) => found,
                Ok(Err(e)) => {
                    warn!("Discovery source {} failed: {}", index, e);
                    return Err(e);
                }
                Err(_) => {
                    warn!("Discovery source {} timed out after {:?}", index, timeout);
                    return Err(DiscoveryError::Timeout(timeout));
                }
            };
            debug!("Discovery source {} returned {} peers", index, found.len());
            peers.extend(found);
        }

        Ok(peers)
    }

    async fn shutdown(&self) {
        for source in &self.sources {
            source.shutdown().await;
        }
    }
}
