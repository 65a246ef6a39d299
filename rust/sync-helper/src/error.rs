//! Error types for the sync helper
//!
//! None of these are fatal to the agent: task bodies return them, the
//! scheduler logs them, and the next tick tries again.

use std::path::PathBuf;
use std::time::Duration;

/// Failures talking to the local node over IPC
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("cannot connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error("node returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("connection closed before a response arrived")]
    Closed,
}

/// Failures talking to the enode registry
#[derive(Debug, thiserror::Error)]
pub enum RegistryClientError {
    /// Connection refused, timeout, or a body that could not be read
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rejected by registry: {0}")]
    Validation(String),

    #[error("unauthorized (check access token)")]
    Unauthorized,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("HTTP error {code}: {message}")]
    Status { code: u16, message: String },
}

impl RegistryClientError {
    /// True when the registry could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        matches!(self, RegistryClientError::Http(e) if e.is_connect() || e.is_timeout())
    }
}

/// Failures determining who this node is
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("could not determine validator address (coinbase, accounts and address file all unavailable)")]
    AddressUnavailable,

    #[error("malformed enode: {0}")]
    MalformedEnode(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Any failure inside a task body
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("node transport: {0}")]
    Transport(#[from] TransportError),

    #[error("registry: {0}")]
    Registry(#[from] RegistryClientError),

    #[error("identity: {0}")]
    Identity(#[from] IdentityError),

    #[error("update flag {path}: {source}")]
    Flag {
        path: PathBuf,
        source: std::io::Error,
    },
}
