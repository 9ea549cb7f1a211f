use std::fmt;
use std::path::PathBuf;

use oai_core::UnknownFingerprint;

use crate::decode::DecodeError;

/// Totals for a harvest that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HarvestSummary {
    pub cycles: u32,
    pub items: usize,
    /// Responses that carried a repository-reported error.
    pub protocol_errors: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportFailure,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    InvalidUrl,
    UnsupportedScheme(String),
    Connect,
    Handshake,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Cancelled,
    Network,
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportFailure::InvalidUrl => write!(f, "invalid url"),
            TransportFailure::UnsupportedScheme(scheme) => {
                write!(f, "unsupported scheme {scheme}")
            }
            TransportFailure::Connect => write!(f, "connect failed"),
            TransportFailure::Handshake => write!(f, "tls handshake failed"),
            TransportFailure::HttpStatus(code) => write!(f, "http status {code}"),
            TransportFailure::Timeout => write!(f, "timeout"),
            TransportFailure::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            TransportFailure::Cancelled => write!(f, "cancelled"),
            TransportFailure::Network => write!(f, "network error"),
        }
    }
}

/// Problems detected before any network I/O.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Fingerprint(#[from] UnknownFingerprint),
    #[error("fan-out needs at least one outlet")]
    NoOutlets,
    #[error("failed to build http client: {0}")]
    Client(String),
    #[error("failed to build tls configuration: {0}")]
    Tls(String),
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Returned by an outlet whose consumer has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("outlet closed")]
pub struct OutletClosed;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("outlet {index} is closed")]
    OutletClosed { index: usize },
    #[error("sink rejected batch: {0}")]
    Rejected(String),
}

/// Terminal failure of a harvest. Repository-reported errors never end up
/// here; they go to the sink.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
    /// The state machine stopped emitting effects without finishing.
    #[error("harvest stalled in cycle {cycle}")]
    Stalled { cycle: u32 },
}
