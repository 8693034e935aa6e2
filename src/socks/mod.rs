//! SOCKS5 client module
//!
//! This module implements the client side of the SOCKS5 CONNECT path:
//! method negotiation, optional username/password sub-negotiation, and the
//! CONNECT request itself. Target hostnames are always handed to the proxy
//! for resolution.

pub mod codec;
mod connector;
mod consts;
mod types;

pub use codec::ConnectReply;
pub use connector::{HandshakeSession, SocksConnector};
pub use consts::*;
pub use types::{AuthMethod, Credential, TargetAddr};
