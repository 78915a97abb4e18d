//! Error types for wire and configuration parsing.

use thiserror::Error;

/// Errors that can occur when decoding wire messages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Datagram is too short to contain the required data
    #[error("Message too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    /// Message id field doesn't match any known message
    #[error("Unknown message id: {0:#06X}")]
    UnknownMessageId(u32),

    /// Track status field outside the enum range
    #[error("Unknown track status: {0}")]
    UnknownTrackStatus(u32),

    /// Classification field outside the enum range
    #[error("Unknown track classification: {0}")]
    UnknownClassification(u32),

    /// Detection count field disagrees with the datagram length
    #[error("Detection count mismatch: header says {declared}, payload holds {available}")]
    CountMismatch { declared: usize, available: usize },
}

/// Errors raised while loading the tracker configuration document.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
