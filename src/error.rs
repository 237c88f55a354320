//! quorumkv Error Types

use thiserror::Error;

use crate::replication::WriteOutcome;

/// Result type alias for quorumkv operations
pub type Result<T> = std::result::Result<T, Error>;

/// quorumkv error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Client input errors
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    // Replication errors
    #[error(
        "Write quorum not met: got {}/{} confirmations; write persisted on leader but replication incomplete",
        .0.acked,
        .0.quorum
    )]
    QuorumNotMet(Box<WriteOutcome>),

    #[error("Quorum must be between 1 and {followers}, got {requested}")]
    InvalidQuorum { requested: usize, followers: usize },

    #[error("Replication error: {0}")]
    Replication(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("Connection failed to {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    #[error("Connection timeout to {0}")]
    ConnectionTimeout(String),

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::ConnectionTimeout(_)
                | Error::ConnectionFailed { .. }
                | Error::QuorumNotMet(_)
                | Error::Network(_)
        )
    }

    /// Stable machine-readable code, used in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) | Error::ConfigParse(_) => "CONFIG_ERROR",
            Error::KeyNotFound(_) => "KEY_NOT_FOUND",
            Error::QuorumNotMet(_) => "QUORUM_NOT_MET",
            Error::InvalidQuorum { .. } => "INVALID_QUORUM",
            Error::Replication(_) => "REPLICATION_ERROR",
            Error::Network(_) | Error::ConnectionFailed { .. } | Error::ConnectionTimeout(_) => {
                "NETWORK_ERROR"
            }
            Error::Storage(_) => "STORAGE_ERROR",
            Error::Io(_) | Error::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
