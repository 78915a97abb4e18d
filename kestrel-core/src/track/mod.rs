//! Track state and lifecycle.

mod initiator;
mod manager;

pub use initiator::{InitiationCandidate, TrackInitiator};
pub use manager::TrackManager;

use crate::matrix::{StateMatrix, StateVector};
use crate::prediction::{ImmState, IMM_NUM_MODELS};
use crate::types::{
    cartesian_to_spherical, CartesianPos, SphericalPos, Timestamp, TrackClassification,
    TrackStatus, TrackUpdate,
};

/// A single kinematic track.
///
/// Tracks are owned exclusively by the [`TrackManager`]; associators see
/// them through read-only slices and the IMM filter mutates the embedded
/// [`ImmState`] only via the manager.
#[derive(Debug, Clone)]
pub struct Track {
    id: u32,
    status: TrackStatus,
    classification: TrackClassification,
    imm: ImmState,

    hit_count: u32,
    miss_count: u32,
    consecutive_misses: u32,
    age: u32,
    quality: f64,
    initiation_time: Timestamp,
    last_update_time: Timestamp,
}

impl Track {
    /// Builds a fresh tentative track. The promoting detection counts as
    /// the first hit.
    pub fn new(
        id: u32,
        x0: StateVector,
        p0: StateMatrix,
        initial_mode_probabilities: [f64; IMM_NUM_MODELS],
        init_time: Timestamp,
    ) -> Self {
        Track {
            id,
            status: TrackStatus::Tentative,
            classification: TrackClassification::Unknown,
            imm: ImmState::new(x0, p0, initial_mode_probabilities),
            hit_count: 1,
            miss_count: 0,
            consecutive_misses: 0,
            age: 0,
            quality: 0.5,
            initiation_time: init_time,
            last_update_time: init_time,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn status(&self) -> TrackStatus {
        self.status
    }

    pub fn set_status(&mut self, status: TrackStatus) {
        self.status = status;
    }

    pub fn classification(&self) -> TrackClassification {
        self.classification
    }

    pub fn set_classification(&mut self, c: TrackClassification) {
        self.classification = c;
    }

    pub fn imm_state(&self) -> &ImmState {
        &self.imm
    }

    pub fn imm_state_mut(&mut self) -> &mut ImmState {
        &mut self.imm
    }

    /// Merged state estimate.
    pub fn state(&self) -> &StateVector {
        &self.imm.merged_state
    }

    /// Merged covariance.
    pub fn covariance(&self) -> &StateMatrix {
        &self.imm.merged_covariance
    }

    pub fn position(&self) -> CartesianPos {
        CartesianPos {
            x: self.imm.merged_state[0],
            y: self.imm.merged_state[3],
            z: self.imm.merged_state[6],
        }
    }

    pub fn velocity(&self) -> CartesianPos {
        CartesianPos {
            x: self.imm.merged_state[1],
            y: self.imm.merged_state[4],
            z: self.imm.merged_state[7],
        }
    }

    pub fn spherical_position(&self) -> SphericalPos {
        let p = self.position();
        cartesian_to_spherical(p.x, p.y, p.z)
    }

    /// Range rate: radial projection of the velocity, 0 at the origin.
    pub fn range_rate(&self) -> f64 {
        let p = self.position();
        let v = self.velocity();
        let r = (p.x * p.x + p.y * p.y + p.z * p.z).sqrt();
        if r < 1e-9 {
            return 0.0;
        }
        (p.x * v.x + p.y * v.y + p.z * v.z) / r
    }

    /// Ground + vertical speed magnitude.
    pub fn speed(&self) -> f64 {
        let v = self.velocity();
        (v.x * v.x + v.y * v.y + v.z * v.z).sqrt()
    }

    pub fn hit_count(&self) -> u32 {
        self.hit_count
    }

    pub fn miss_count(&self) -> u32 {
        self.miss_count
    }

    pub fn consecutive_misses(&self) -> u32 {
        self.consecutive_misses
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn quality(&self) -> f64 {
        self.quality
    }

    pub fn set_quality(&mut self, q: f64) {
        self.quality = q;
    }

    pub fn last_update_time(&self) -> Timestamp {
        self.last_update_time
    }

    pub fn initiation_time(&self) -> Timestamp {
        self.initiation_time
    }

    /// Registers a measurement update at `now`.
    pub fn record_hit(&mut self, now: Timestamp) {
        self.hit_count += 1;
        self.consecutive_misses = 0;
        self.last_update_time = now;
    }

    /// Registers a dwell without a measurement.
    pub fn record_miss(&mut self) {
        self.miss_count += 1;
        self.consecutive_misses += 1;
    }

    pub fn increment_age(&mut self) {
        self.age += 1;
    }

    /// Snapshot for the egress track table.
    pub fn to_update(&self) -> TrackUpdate {
        let sph = self.spherical_position();
        let pos = self.position();
        let vel = self.velocity();
        TrackUpdate {
            track_id: self.id,
            timestamp: self.last_update_time,
            status: self.status,
            classification: self.classification,
            range: sph.range,
            azimuth: sph.azimuth,
            elevation: sph.elevation,
            range_rate: self.range_rate(),
            x: pos.x,
            y: pos.y,
            z: pos.z,
            vx: vel.x,
            vy: vel.y,
            vz: vel.z,
            quality: self.quality,
            hit_count: self.hit_count,
            miss_count: self.miss_count,
            age: self.age,
        }
    }
}
