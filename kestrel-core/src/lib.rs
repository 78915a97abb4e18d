//! Kestrel Core — platform-independent Counter-UAS tracking pipeline.
//!
//! This crate contains the pure tracking logic: detection preprocessing,
//! clustering, the five-model IMM estimator, measurement-to-track
//! association and the track lifecycle. It performs no I/O; the companion
//! `kestrel-server` crate supplies the UDP transport, configuration
//! loading and binary dwell recording around it.
//!
//! # Pipeline
//!
//! Each dwell runs the same fixed sequence through [`track::TrackManager`]:
//!
//! ```text
//! Dwell ─▶ Preprocess ─▶ Cluster ─▶ Predict ─▶ Associate
//!               ─▶ Update matched / Miss unmatched / Initiate
//!               ─▶ Maintain ─▶ Delete ─▶ Classify ─▶ Track table
//! ```
//!
//! # Example
//!
//! ```rust
//! use kestrel_core::config::TrackerConfig;
//! use kestrel_core::recorder::NullRecorder;
//! use kestrel_core::track::TrackManager;
//! use kestrel_core::types::SpDetectionMessage;
//!
//! let config = TrackerConfig::from_json("{}").unwrap();
//! let mut manager = TrackManager::new(config, Box::new(NullRecorder));
//!
//! let dwell = SpDetectionMessage::default();
//! let track_table = manager.process_dwell(&dwell);
//! assert!(track_table.is_empty());
//! ```

pub mod association;
pub mod clustering;
pub mod config;
pub mod error;
pub mod matrix;
pub mod prediction;
pub mod preprocess;
pub mod protocol;
pub mod recorder;
pub mod track;
pub mod types;

// Re-export commonly used types
pub use config::TrackerConfig;
pub use error::{ConfigError, ParseError};
pub use track::{Track, TrackManager};
pub use types::{Detection, SpDetectionMessage, TrackStatus, TrackUpdate};
