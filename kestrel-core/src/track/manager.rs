//! The per-dwell tracking pipeline.

use log::{debug, info, trace, warn};

use crate::association::AssociationEngine;
use crate::clustering::ClusterEngine;
use crate::config::TrackerConfig;
use crate::matrix::{measurement_noise, MeasMatrix, MeasVector};
use crate::prediction::ImmFilter;
use crate::preprocess::Preprocessor;
use crate::recorder::DwellRecorder;
use crate::types::{
    now_micros, Cluster, SpDetectionMessage, Timestamp, TrackClassification, TrackStatus,
    TrackUpdate,
};

use super::{Track, TrackInitiator};

/// Per-axis measurement noise standard deviation in meters. The signal
/// processor does not report per-detection accuracy, so R is constant.
const MEASUREMENT_NOISE_STD: f64 = 25.0;

/// Owns the track set and runs the fixed per-dwell pipeline:
/// preprocess → cluster → predict → associate → update/miss/initiate →
/// maintain → delete → classify → emit.
///
/// Exactly one `TrackManager` exists per process and exactly one caller
/// drives it; nothing here is shared across threads.
pub struct TrackManager {
    config: TrackerConfig,
    preprocessor: Preprocessor,
    cluster_engine: ClusterEngine,
    imm_filter: ImmFilter,
    association_engine: AssociationEngine,
    initiator: TrackInitiator,
    recorder: Box<dyn DwellRecorder>,

    tracks: Vec<Track>,
    measurement_noise: MeasMatrix,
    last_dwell_time: Timestamp,
    dwell_count: u32,
}

impl TrackManager {
    pub fn new(config: TrackerConfig, recorder: Box<dyn DwellRecorder>) -> Self {
        let preprocessor = Preprocessor::new(config.preprocessing.clone());
        let cluster_engine = ClusterEngine::new(&config.clustering);
        let imm_filter = ImmFilter::new(&config.prediction);
        let association_engine = AssociationEngine::new(&config.association);
        let initiator = TrackInitiator::new(
            config.track_management.initiation.clone(),
            config.track_management.initial_covariance.clone(),
            config.prediction.imm.initial_mode_probabilities,
        );

        info!(
            "Track manager ready: clustering={}, association={}",
            cluster_engine.method_name(),
            association_engine.method_name()
        );

        TrackManager {
            config,
            preprocessor,
            cluster_engine,
            imm_filter,
            association_engine,
            initiator,
            recorder,
            tracks: Vec::new(),
            measurement_noise: measurement_noise(MEASUREMENT_NOISE_STD),
            last_dwell_time: 0,
            dwell_count: 0,
        }
    }

    /// Runs the complete pipeline for one dwell and returns the track table
    /// to emit.
    pub fn process_dwell(&mut self, msg: &SpDetectionMessage) -> Vec<TrackUpdate> {
        let ts = if msg.timestamp > 0 {
            msg.timestamp
        } else {
            now_micros()
        };
        self.dwell_count = msg.dwell_count;

        debug!(
            "=== Dwell {}: {} detections ===",
            self.dwell_count,
            msg.detections.len()
        );

        self.recorder.raw_detections(ts, msg);

        let filtered = self.preprocessor.process(&msg.detections);
        self.recorder.preprocessed(ts, &filtered);

        let clusters = self.cluster_engine.process(&filtered);
        self.recorder.clustered(ts, &clusters);

        let dt = self.dwell_dt(ts);
        self.predict(dt, ts);
        self.associate(&clusters, ts);

        self.maintain_tracks();
        self.delete_tracks(ts);
        self.classify_tracks();

        self.last_dwell_time = ts;

        debug!(
            "Dwell {} done: {} tracks ({} confirmed)",
            self.dwell_count,
            self.tracks.len(),
            self.num_confirmed_tracks()
        );

        self.tracks.iter().map(Track::to_update).collect()
    }

    /// Seconds since the previous dwell, clamped to the cycle period when
    /// absent, non-positive or implausibly large.
    fn dwell_dt(&self, ts: Timestamp) -> f64 {
        let cycle = self.config.system.cycle_period_ms as f64 * 1e-3;
        if self.last_dwell_time == 0 {
            return cycle;
        }
        let dt = (ts as f64 - self.last_dwell_time as f64) * 1e-6;
        if dt <= 0.0 || dt > 10.0 {
            warn!("Anomalous dwell dt {:.3}s, clamping to {:.3}s", dt, cycle);
            cycle
        } else {
            dt
        }
    }

    fn predict(&mut self, dt: f64, ts: Timestamp) {
        for track in self.tracks.iter_mut() {
            self.imm_filter.predict(dt, track.imm_state_mut());
            track.increment_age();
            self.recorder.predicted(ts, track.id(), track.state());

            trace!(
                "Predicted track {}: x={:.1} y={:.1} z={:.1}",
                track.id(),
                track.state()[0],
                track.state()[3],
                track.state()[6]
            );
        }
    }

    fn associate(&mut self, clusters: &[Cluster], ts: Timestamp) {
        let result =
            self.association_engine
                .process(&self.tracks, clusters, &self.measurement_noise);

        for m in &result.matched {
            let cluster = &clusters[m.cluster_index];
            let z = MeasVector::new(cluster.cartesian.x, cluster.cartesian.y, cluster.cartesian.z);

            let track = &mut self.tracks[m.track_index];
            self.imm_filter
                .update(track.imm_state_mut(), &z, &self.measurement_noise);
            track.record_hit(ts);

            self.recorder
                .associated(ts, track.id(), cluster.cluster_id, m.distance);
            self.recorder
                .track_updated(ts, track.id(), track.status(), track.state());

            trace!(
                "Track {} updated with cluster {} (d={:.2})",
                track.id(),
                cluster.cluster_id,
                m.distance
            );
        }

        for &t in &result.unmatched_tracks {
            self.tracks[t].record_miss();
            trace!("Track {} missed", self.tracks[t].id());
        }

        let unmatched: Vec<Cluster> = result
            .unmatched_clusters
            .iter()
            .map(|&c| clusters[c].clone())
            .collect();

        if !unmatched.is_empty() {
            let new_tracks = self
                .initiator
                .process_candidates(&unmatched, ts, self.dwell_count);

            let max_tracks = self.config.system.max_tracks as usize;
            for track in new_tracks {
                if self.tracks.len() >= max_tracks {
                    warn!(
                        "Track capacity {} reached, dropping new track {}",
                        max_tracks,
                        track.id()
                    );
                    continue;
                }
                self.recorder.track_initiated(ts, track.id(), track.state());
                self.tracks.push(track);
            }
        }

        self.initiator.purge_stale_candidates(self.dwell_count);
    }

    /// Quality bookkeeping and the status state machine.
    fn maintain_tracks(&mut self) {
        let maint = &self.config.track_management.maintenance;

        for track in self.tracks.iter_mut() {
            let q = track.quality();
            if track.consecutive_misses() == 0 {
                track.set_quality((q + maint.quality_boost).min(1.0));
            } else {
                track.set_quality(q * maint.quality_decay_rate);
            }

            match track.status() {
                TrackStatus::Tentative => {
                    if track.hit_count() >= maint.confirm_hits {
                        track.set_status(TrackStatus::Confirmed);
                        info!(
                            "Track {} confirmed (hits={})",
                            track.id(),
                            track.hit_count()
                        );
                    }
                }
                TrackStatus::Confirmed => {
                    if track.consecutive_misses() > 0 {
                        track.set_status(TrackStatus::Coasting);
                        debug!(
                            "Track {} coasting (misses={})",
                            track.id(),
                            track.consecutive_misses()
                        );
                    }
                }
                TrackStatus::Coasting => {
                    if track.consecutive_misses() == 0 {
                        track.set_status(TrackStatus::Confirmed);
                    }
                }
                TrackStatus::Deleted => {}
            }
        }
    }

    /// Applies the deletion predicates, first match recorded as the reason,
    /// and removes the deleted tracks from the active set.
    fn delete_tracks(&mut self, ts: Timestamp) {
        let del = &self.config.track_management.deletion;

        for track in self.tracks.iter_mut() {
            if track.status() == TrackStatus::Deleted {
                continue;
            }

            let reason = if track.consecutive_misses() >= del.max_coasting_dwells {
                Some("max_coasting")
            } else if track.quality() < del.min_quality {
                Some("low_quality")
            } else if track.spherical_position().range > del.max_range {
                Some("out_of_range")
            } else {
                None
            };

            if let Some(reason) = reason {
                track.set_status(TrackStatus::Deleted);
                self.recorder.track_deleted(ts, track.id());
                info!("Track {} deleted ({})", track.id(), reason);
            }
        }

        self.tracks.retain(|t| t.status() != TrackStatus::Deleted);
    }

    /// Speed and mode-probability heuristic, recomputed every dwell.
    fn classify_tracks(&mut self) {
        for track in self.tracks.iter_mut() {
            let speed = track.speed();
            let probs = &track.imm_state().mode_probabilities;
            let cv_prob = probs[0];
            let ca_prob = probs[1] + probs[2];
            let ctr_prob = probs[3] + probs[4];

            let class = if speed < 2.0 {
                TrackClassification::Clutter
            } else if ctr_prob > 0.4 && speed > 5.0 && speed < 30.0 {
                TrackClassification::DroneRotary
            } else if cv_prob > 0.3 && speed > 15.0 && speed < 80.0 {
                TrackClassification::DroneFixedWing
            } else if ca_prob > 0.3 && speed > 5.0 && speed < 25.0 {
                TrackClassification::Bird
            } else {
                TrackClassification::Unknown
            };
            track.set_classification(class);
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn num_active_tracks(&self) -> usize {
        self.tracks.len()
    }

    pub fn num_confirmed_tracks(&self) -> usize {
        self.tracks
            .iter()
            .filter(|t| t.status() == TrackStatus::Confirmed)
            .count()
    }

    pub fn num_candidates(&self) -> usize {
        self.initiator.num_candidates()
    }

    pub fn rejected_detections(&self) -> u64 {
        self.preprocessor.rejected_count()
    }

    /// Access for the caller to record post-pipeline events (sent tracks).
    pub fn recorder_mut(&mut self) -> &mut dyn DwellRecorder {
        self.recorder.as_mut()
    }
}
