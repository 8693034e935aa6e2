//! Peer discovery for proxy-only networks
//!
//! A [`Discovery`] source yields candidate peers as [`TargetAddr`] values
//! that are handed to a dialer unresolved.

mod multi;
mod seed;

pub use multi::MultiDiscovery;
pub use seed::SeedOnionDiscovery;

use crate::error::DiscoveryError;
use crate::socks::TargetAddr;
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

/// A provider of candidate peer addresses
#[async_trait]
pub trait Discovery: Debug + Send + Sync {
    /// Fetch peers advertising all bits in `services`, within `timeout`
    async fn get_peers(
        &self,
        services: u64,
        timeout: Duration,
    ) -> Result<Vec<TargetAddr>, DiscoveryError>;

    /// Release resources; calling it more than once is harmless
    async fn shutdown(&self);
}
