//! # Kestrel Server
//!
//! The runnable Counter-UAS radar tracker service.
//!
//! This crate wraps the pure tracking pipeline from [`kestrel_core`] with
//! the operational shell: UDP ingress and egress, configuration loading,
//! console logging, binary dwell recording and graceful shutdown.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     kestrel-server                       │
//! │                                                          │
//! │  ┌────────────────┐   FIFO    ┌────────────────────────┐ │
//! │  │ Receiver       │──────────▶│ Processor              │ │
//! │  │ (UDP ingress,  │  mpsc     │  TrackManager          │ │
//! │  │  wire decode)  │           │  (kestrel-core)        │ │
//! │  └────────────────┘           │        │               │ │
//! │                               │        ▼               │ │
//! │  ┌────────────────┐           │  ┌──────────────────┐  │ │
//! │  │ BinaryRecorder │◀──────────│  │ TrackSender      │  │ │
//! │  │ (dwell log)    │           │  │ (UDP egress)     │  │ │
//! │  └────────────────┘           │  └──────────────────┘  │ │
//! │                               └────────────────────────┘ │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Two subsystems run under a `tokio-graceful-shutdown` toplevel: the
//! receiver (blocking on the socket) and the processor (blocking on the
//! FIFO). Both observe shutdown at their select points; dwells still
//! queued at shutdown are dropped.

use std::path::PathBuf;

use clap::Parser;

pub mod error;
pub mod processor;
pub mod receiver;
pub mod recording;
pub mod sender;

pub use error::ServerError;

/// Command-line interface.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "kestrel-server",
    about = "Counter-UAS radar tracker",
    version
)]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Path to the tracker configuration document
    #[arg(default_value = "config/tracker.json")]
    pub config: PathBuf,
}

/// Maps the config's numeric log level (0 = error .. 4 = trace) to a
/// filter for the console logger.
pub fn config_log_filter(level: u8) -> log::LevelFilter {
    match level {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["kestrel-server"]);
        assert_eq!(cli.config, PathBuf::from("config/tracker.json"));
    }

    #[test]
    fn test_cli_config_positional() {
        let cli = Cli::parse_from(["kestrel-server", "/etc/kestrel/site.json"]);
        assert_eq!(cli.config, PathBuf::from("/etc/kestrel/site.json"));
    }

    #[test]
    fn test_config_log_filter_mapping() {
        assert_eq!(config_log_filter(0), log::LevelFilter::Error);
        assert_eq!(config_log_filter(2), log::LevelFilter::Info);
        assert_eq!(config_log_filter(4), log::LevelFilter::Trace);
        assert_eq!(config_log_filter(9), log::LevelFilter::Trace);
    }
}
