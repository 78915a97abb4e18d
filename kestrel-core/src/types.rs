//! Core data model shared across the tracking pipeline.
//!
//! Detections arrive from the signal processor in spherical sensor
//! coordinates; everything downstream of clustering works in Cartesian
//! meters. Conversions between the two frames live here.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ParseError;

/// Microseconds since the Unix epoch.
pub type Timestamp = u64;

/// Current wall-clock time in microseconds since the Unix epoch.
pub fn now_micros() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Message id of the ingress signal-processor detection message.
pub const MSG_ID_SP_DETECTION: u32 = 0x0001;
/// Message id of a single track record inside a track table.
pub const MSG_ID_TRACK_UPDATE: u32 = 0x0002;
/// Message id of the egress track table message.
pub const MSG_ID_TRACK_TABLE: u32 = 0x0003;

// ---------------------------------------------------------------------------
// Detections
// ---------------------------------------------------------------------------

/// A single raw return from the signal processor. Immutable after receipt.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Detection {
    /// Range in meters
    pub range: f64,
    /// Azimuth in radians
    pub azimuth: f64,
    /// Elevation in radians
    pub elevation: f64,
    /// Signal strength in dBm
    pub strength: f64,
    /// Noise floor in dBm
    pub noise: f64,
    /// Signal-to-noise ratio in dB
    pub snr: f64,
    /// Radar cross section in dBsm
    pub rcs: f64,
    /// Micro-Doppler signature in Hz
    pub micro_doppler: f64,
}

/// One dwell's worth of detections as delivered by the signal processor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpDetectionMessage {
    pub dwell_count: u32,
    /// Microseconds since epoch; 0 means "not stamped by the sensor"
    pub timestamp: Timestamp,
    pub detections: Vec<Detection>,
}

// ---------------------------------------------------------------------------
// Coordinate frames
// ---------------------------------------------------------------------------

/// Position in Cartesian meters, x/y in the horizontal plane, z up.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CartesianPos {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Position in sensor-spherical coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SphericalPos {
    /// Range in meters
    pub range: f64,
    /// Azimuth in radians
    pub azimuth: f64,
    /// Elevation in radians
    pub elevation: f64,
}

/// Convert a spherical sensor position to Cartesian meters.
pub fn spherical_to_cartesian(range: f64, azimuth: f64, elevation: f64) -> CartesianPos {
    CartesianPos {
        x: range * elevation.cos() * azimuth.cos(),
        y: range * elevation.cos() * azimuth.sin(),
        z: range * elevation.sin(),
    }
}

/// Convert a Cartesian position back to sensor-spherical coordinates.
///
/// Elevation is 0 for points within 1 nm of the origin, where it is
/// undefined.
pub fn cartesian_to_spherical(x: f64, y: f64, z: f64) -> SphericalPos {
    let range = (x * x + y * y + z * z).sqrt();
    SphericalPos {
        range,
        azimuth: y.atan2(x),
        elevation: if range > 1e-9 { (z / range).asin() } else { 0.0 },
    }
}

// ---------------------------------------------------------------------------
// Clusters
// ---------------------------------------------------------------------------

/// A centroided group of detections treated as one measurement.
///
/// The spherical fields are the strength-weighted mean of the member
/// detections; `cartesian` is always derived from that spherical mean,
/// never the other way round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cluster {
    /// Assigned monotonically by the cluster engine, unique per process run
    pub cluster_id: u32,
    pub range: f64,
    pub azimuth: f64,
    pub elevation: f64,
    /// Arithmetic mean of member strengths in dB
    pub strength: f64,
    pub snr: f64,
    pub rcs: f64,
    pub micro_doppler: f64,
    pub num_detections: u32,
    pub cartesian: CartesianPos,
    /// Indices of member detections in the preprocessed dwell
    pub detection_indices: Vec<u32>,
}

// ---------------------------------------------------------------------------
// Track status and classification
// ---------------------------------------------------------------------------

/// Lifecycle state of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum TrackStatus {
    #[default]
    Tentative = 0,
    Confirmed = 1,
    Coasting = 2,
    Deleted = 3,
}

impl TryFrom<u32> for TrackStatus {
    type Error = ParseError;

    fn try_from(v: u32) -> Result<Self, ParseError> {
        match v {
            0 => Ok(TrackStatus::Tentative),
            1 => Ok(TrackStatus::Confirmed),
            2 => Ok(TrackStatus::Coasting),
            3 => Ok(TrackStatus::Deleted),
            _ => Err(ParseError::UnknownTrackStatus(v)),
        }
    }
}

/// Heuristic target class, recomputed every dwell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum TrackClassification {
    #[default]
    Unknown = 0,
    DroneRotary = 1,
    DroneFixedWing = 2,
    Bird = 3,
    Clutter = 4,
}

impl TryFrom<u32> for TrackClassification {
    type Error = ParseError;

    fn try_from(v: u32) -> Result<Self, ParseError> {
        match v {
            0 => Ok(TrackClassification::Unknown),
            1 => Ok(TrackClassification::DroneRotary),
            2 => Ok(TrackClassification::DroneFixedWing),
            3 => Ok(TrackClassification::Bird),
            4 => Ok(TrackClassification::Clutter),
            _ => Err(ParseError::UnknownClassification(v)),
        }
    }
}

// ---------------------------------------------------------------------------
// Track update record
// ---------------------------------------------------------------------------

/// One track's state as published to downstream consumers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackUpdate {
    pub track_id: u32,
    pub timestamp: Timestamp,
    pub status: TrackStatus,
    pub classification: TrackClassification,
    pub range: f64,
    pub azimuth: f64,
    pub elevation: f64,
    pub range_rate: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
    pub quality: f64,
    pub hit_count: u32,
    pub miss_count: u32,
    pub age: u32,
}
