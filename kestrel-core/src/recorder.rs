//! Observer interface for per-stage dwell records.
//!
//! The pipeline reports every stage of a dwell through this trait; the
//! server side implements it with the binary log writer. Keeping the trait
//! here lets the core stay free of file I/O.

use crate::matrix::StateVector;
use crate::types::{Cluster, Detection, SpDetectionMessage, Timestamp, TrackStatus, TrackUpdate};

/// Receives one callback per pipeline stage per dwell.
///
/// Implementations must be cheap when disabled; the pipeline calls these
/// unconditionally.
pub trait DwellRecorder: Send {
    fn raw_detections(&mut self, ts: Timestamp, msg: &SpDetectionMessage);
    fn preprocessed(&mut self, ts: Timestamp, detections: &[Detection]);
    fn clustered(&mut self, ts: Timestamp, clusters: &[Cluster]);
    fn predicted(&mut self, ts: Timestamp, track_id: u32, state: &StateVector);
    fn associated(&mut self, ts: Timestamp, track_id: u32, cluster_id: u32, distance: f64);
    fn track_initiated(&mut self, ts: Timestamp, track_id: u32, state: &StateVector);
    fn track_updated(&mut self, ts: Timestamp, track_id: u32, status: TrackStatus, state: &StateVector);
    fn track_deleted(&mut self, ts: Timestamp, track_id: u32);
    fn track_sent(&mut self, ts: Timestamp, update: &TrackUpdate);
}

/// Recorder that drops everything; used when dwell logging is disabled.
pub struct NullRecorder;

impl DwellRecorder for NullRecorder {
    fn raw_detections(&mut self, _ts: Timestamp, _msg: &SpDetectionMessage) {}
    fn preprocessed(&mut self, _ts: Timestamp, _detections: &[Detection]) {}
    fn clustered(&mut self, _ts: Timestamp, _clusters: &[Cluster]) {}
    fn predicted(&mut self, _ts: Timestamp, _track_id: u32, _state: &StateVector) {}
    fn associated(&mut self, _ts: Timestamp, _track_id: u32, _cluster_id: u32, _distance: f64) {}
    fn track_initiated(&mut self, _ts: Timestamp, _track_id: u32, _state: &StateVector) {}
    fn track_updated(
        &mut self,
        _ts: Timestamp,
        _track_id: u32,
        _status: TrackStatus,
        _state: &StateVector,
    ) {
    }
    fn track_deleted(&mut self, _ts: Timestamp, _track_id: u32) {}
    fn track_sent(&mut self, _ts: Timestamp, _update: &TrackUpdate) {}
}
