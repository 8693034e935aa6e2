//! Error types for socks-peer
//!
//! This module defines the error taxonomy for the SOCKS5 client path and for
//! peer discovery.

use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Main error type for socks-peer operations
#[derive(Error, Debug)]
pub enum SocksPeerError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid address string
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// SOCKS5 client error
    #[error("SOCKS5 error: {0}")]
    Socks(#[from] SocksError),

    /// Peer discovery error
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),
}

/// Handshake phase in which a timeout or failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Method negotiation
    Greeting,
    /// Username/password sub-negotiation
    Authenticating,
    /// CONNECT request and reply
    Connecting,
    /// Tunnel is up
    Established,
    /// Handshake aborted
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Greeting => write!(f, "greeting"),
            Phase::Authenticating => write!(f, "authenticating"),
            Phase::Connecting => write!(f, "connecting"),
            Phase::Established => write!(f, "established"),
            Phase::Failed => write!(f, "failed"),
        }
    }
}

/// SOCKS5 client errors
#[derive(Error, Debug)]
pub enum SocksError {
    /// A reply carried the wrong protocol version
    #[error("SOCKS protocol mismatch: expected version {expected}, got {actual}")]
    ProtocolMismatch {
        /// Version we expected
        expected: u8,
        /// Version the proxy sent
        actual: u8,
    },

    /// The proxy selected 0xFF or a method we never offered
    #[error("No acceptable authentication method (proxy selected {0:#04x})")]
    NoAcceptableAuthMethod(u8),

    /// Username/password sub-negotiation failed
    #[error("Authentication rejected (version {version}, status {status})")]
    AuthenticationRejected {
        /// Sub-negotiation version in the reply
        version: u8,
        /// Status byte in the reply
        status: u8,
    },

    /// The proxy answered CONNECT with a failure code
    #[error("CONNECT failed: {0}")]
    Connect(ReplyCode),

    /// Premature EOF or a malformed length/address field
    #[error("Protocol desync: {0}")]
    ProtocolDesync(String),

    /// TCP-level failure reaching the proxy
    #[error("Failed to reach proxy {proxy}: {source}")]
    Dial {
        /// Proxy endpoint as configured
        proxy: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// A deadline expired
    #[error("Timed out during {phase} after {after:?}")]
    Timeout {
        /// Phase that was running when the deadline expired
        phase: Phase,
        /// Configured deadline
        after: Duration,
    },

    /// Target cannot be encoded in a CONNECT request
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Credential cannot be encoded in an auth request
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// Transport error during the handshake
    #[error("IO error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for SocksError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            SocksError::ProtocolDesync("unexpected end of stream".to_string())
        } else {
            SocksError::Io(err)
        }
    }
}

impl SocksError {
    /// Whether a caller may reasonably try the same proxy again later
    ///
    /// Misconfiguration (version mismatch, auth problems, bad input) will not
    /// fix itself; everything else is treated as a transient condition.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            SocksError::ProtocolMismatch { .. }
                | SocksError::NoAcceptableAuthMethod(_)
                | SocksError::AuthenticationRejected { .. }
                | SocksError::InvalidTarget(_)
                | SocksError::InvalidCredential(_)
        )
    }
}

impl From<SocksError> for io::Error {
    fn from(err: SocksError) -> Self {
        let kind = match &err {
            SocksError::Io(e) => e.kind(),
            SocksError::Dial { source, .. } => source.kind(),
            SocksError::Timeout { .. } => io::ErrorKind::TimedOut,
            SocksError::Connect(ReplyCode::ConnectionRefused) => io::ErrorKind::ConnectionRefused,
            SocksError::Connect(ReplyCode::NotAllowed) => io::ErrorKind::PermissionDenied,
            SocksError::Connect(_) => io::ErrorKind::ConnectionAborted,
            SocksError::AuthenticationRejected { .. } | SocksError::NoAcceptableAuthMethod(_) => {
                io::ErrorKind::PermissionDenied
            }
            SocksError::InvalidTarget(_) | SocksError::InvalidCredential(_) => {
                io::ErrorKind::InvalidInput
            }
            SocksError::ProtocolMismatch { .. } | SocksError::ProtocolDesync(_) => {
                io::ErrorKind::InvalidData
            }
        };
        io::Error::new(kind, err)
    }
}

/// Peer discovery errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// The source cannot filter by service bits
    #[error("Service bit filtering is not supported: {0:#x}")]
    UnsupportedFilter(u64),

    /// The source did not answer within the deadline
    #[error("Discovery timed out after {0:?}")]
    Timeout(Duration),

    /// The source was shut down
    #[error("Discovery source has been shut down")]
    ShutDown,

    /// Source-specific failure
    #[error("Discovery failed: {0}")]
    Failed(String),
}

/// Reply codes of a SOCKS5 CONNECT reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCode {
    /// Command succeeded
    Succeeded,
    /// General SOCKS server failure
    GeneralFailure,
    /// Connection not allowed by ruleset
    NotAllowed,
    /// Network unreachable
    NetworkUnreachable,
    /// Host unreachable
    HostUnreachable,
    /// Connection refused
    ConnectionRefused,
    /// TTL expired
    TtlExpired,
    /// Command not supported
    CommandNotSupported,
    /// Address type not supported
    AddressTypeNotSupported,
    /// Any code outside the table
    Unknown(u8),
}

impl ReplyCode {
    /// Whether this is the success code
    pub fn is_success(self) -> bool {
        self == ReplyCode::Succeeded
    }
}

impl From<u8> for ReplyCode {
    fn from(value: u8) -> Self {
        match value {
            0x00 => ReplyCode::Succeeded,
            0x01 => ReplyCode::GeneralFailure,
            0x02 => ReplyCode::NotAllowed,
            0x03 => ReplyCode::NetworkUnreachable,
            0x04 => ReplyCode::HostUnreachable,
            0x05 => ReplyCode::ConnectionRefused,
            0x06 => ReplyCode::TtlExpired,
            0x07 => ReplyCode::CommandNotSupported,
            0x08 => ReplyCode::AddressTypeNotSupported,
            other => ReplyCode::Unknown(other),
        }
    }
}

impl From<ReplyCode> for u8 {
    fn from(code: ReplyCode) -> Self {
        match code {
            ReplyCode::Succeeded => 0x00,
            ReplyCode::GeneralFailure => 0x01,
            ReplyCode::NotAllowed => 0x02,
            ReplyCode::NetworkUnreachable => 0x03,
            ReplyCode::HostUnreachable => 0x04,
            ReplyCode::ConnectionRefused => 0x05,
            ReplyCode::TtlExpired => 0x06,
            ReplyCode::CommandNotSupported => 0x07,
            ReplyCode::AddressTypeNotSupported => 0x08,
            ReplyCode::Unknown(code) => code,
        }
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplyCode::Succeeded => write!(f, "succeeded"),
            ReplyCode::GeneralFailure => write!(f, "general SOCKS server failure"),
            ReplyCode::NotAllowed => write!(f, "connection not allowed by ruleset"),
            ReplyCode::NetworkUnreachable => write!(f, "network unreachable"),
            ReplyCode::HostUnreachable => write!(f, "host unreachable"),
            ReplyCode::ConnectionRefused => write!(f, "connection refused"),
            ReplyCode::TtlExpired => write!(f, "TTL expired"),
            ReplyCode::CommandNotSupported => write!(f, "command not supported"),
            ReplyCode::AddressTypeNotSupported => write!(f, "address type not supported"),
            ReplyCode::Unknown(code) => write!(f, "unknown reply code {:#04x}", code),
        }
    }
}
