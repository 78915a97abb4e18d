//! Server-side error types.

use thiserror::Error;

/// Errors raised by the server around the tracking core.
///
/// Startup variants (config, bind, address) are fatal and terminate the
/// process with exit code 1; everything at runtime is confined to the
/// offending message or dwell.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("I/O operation failed")]
    Io(#[from] std::io::Error),

    #[error("Cannot read configuration file '{path}'")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] kestrel_core::ConfigError),

    #[error("Cannot bind UDP socket on {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid network address '{0}'")]
    Address(String),

    #[error("Shutdown requested")]
    Shutdown,
}
