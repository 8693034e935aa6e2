//! # socks-peer - SOCKS5 dialing and proxy-only peer discovery
//!
//! socks-peer lets a peer-to-peer client open outbound TCP connections
//! through a SOCKS5 proxy such as Tor, and discover candidate peers that are
//! reachable only through that proxy.
//!
//! ## Features
//!
//! - **CONNECT client**: RFC 1928 handshake with optional RFC 1929
//!   username/password authentication
//! - **No local resolution**: target hostnames go to the proxy as domain
//!   names and are never looked up on this host
//! - **Dialer capability**: callers depend on [`dialer::Dialer`] and receive a
//!   stream already tunneled to the target
//! - **Discovery**: static onion seed lists, composed in order by
//!   [`discovery::MultiDiscovery`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use socks_peer::config::load_config;
//! use socks_peer::dialer::ProxiedDialer;
//! use socks_peer::discovery::{Discovery, MultiDiscovery, SeedOnionDiscovery};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config("socks-peer.toml")?;
//!     let dialer = ProxiedDialer::from_config(&config.proxy)?;
//!     let discovery = MultiDiscovery::default()
//!         .with_source(Arc::new(SeedOnionDiscovery::from_config(&config.discovery)?));
//!
//!     for peer in discovery.get_peers(0, config.discovery.timeout()).await? {
//!         let stream = dialer.dial(&peer).await?;
//!         // use the tunneled stream
//!     }
//!     discovery.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! MultiDiscovery -> TargetAddr -> ProxiedDialer -> SocksConnector -> codec
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod dialer;
pub mod discovery;
pub mod error;
pub mod socks;

// Re-export commonly used items
pub use config::{load_config, Config};
pub use dialer::{Dialer, ProxiedDialer};
pub use discovery::{Discovery, MultiDiscovery, SeedOnionDiscovery};
pub use error::{DiscoveryError, SocksError, SocksPeerError};
pub use socks::{Credential, SocksConnector, TargetAddr};

/// Version of the socks-peer library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");
