//! M-of-N track initiation from unmatched clusters.

use std::collections::VecDeque;

use log::info;

use crate::config::{InitialCovarianceConfig, InitiationConfig};
use crate::matrix::{StateMatrix, StateVector};
use crate::prediction::IMM_NUM_MODELS;
use crate::types::{Cluster, Timestamp};

use super::Track;

/// One sighting in a candidate's history.
#[derive(Debug, Clone)]
struct TentativeDetection {
    cluster: Cluster,
    timestamp: Timestamp,
    dwell_count: u32,
}

/// A would-be track accumulating sightings until M-of-N resolves it.
#[derive(Debug, Clone)]
pub struct InitiationCandidate {
    history: VecDeque<TentativeDetection>,
    hits: u32,
    total: u32,
    promoted: bool,
}

/// Promotes clusters that recur across dwells into tracks.
///
/// Track ids are handed out here, 1-based and strictly increasing for the
/// process lifetime.
pub struct TrackInitiator {
    init_cfg: InitiationConfig,
    cov_cfg: InitialCovarianceConfig,
    initial_mode_probabilities: [f64; IMM_NUM_MODELS],
    candidates: Vec<InitiationCandidate>,
    next_id: u32,
}

impl TrackInitiator {
    pub fn new(
        init_cfg: InitiationConfig,
        cov_cfg: InitialCovarianceConfig,
        initial_mode_probabilities: [f64; IMM_NUM_MODELS],
    ) -> Self {
        TrackInitiator {
            init_cfg,
            cov_cfg,
            initial_mode_probabilities,
            candidates: Vec::new(),
            next_id: 1,
        }
    }

    fn next_track_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// State from the last two history entries: position from the latest,
    /// velocity as the finite difference (zero when the entries are
    /// effectively simultaneous).
    fn init_state(c0: &Cluster, c1: &Cluster, dt: f64) -> StateVector {
        let mut x = StateVector::zeros();
        x[0] = c1.cartesian.x;
        x[3] = c1.cartesian.y;
        x[6] = c1.cartesian.z;
        if dt > 1e-6 {
            x[1] = (c1.cartesian.x - c0.cartesian.x) / dt;
            x[4] = (c1.cartesian.y - c0.cartesian.y) / dt;
            x[7] = (c1.cartesian.z - c0.cartesian.z) / dt;
        }
        x
    }

    /// Block-diagonal initial covariance from the configured stds.
    fn init_covariance(&self) -> StateMatrix {
        let sp2 = self.cov_cfg.position_std * self.cov_cfg.position_std;
        let sv2 = self.cov_cfg.velocity_std * self.cov_cfg.velocity_std;
        let sa2 = self.cov_cfg.acceleration_std * self.cov_cfg.acceleration_std;

        let mut p = StateMatrix::zeros();
        for axis in 0..3 {
            p[(axis * 3, axis * 3)] = sp2;
            p[(axis * 3 + 1, axis * 3 + 1)] = sv2;
            p[(axis * 3 + 2, axis * 3 + 2)] = sa2;
        }
        p
    }

    /// Feeds one dwell's unmatched clusters through the candidate set and
    /// returns any tracks promoted this dwell.
    pub fn process_candidates(
        &mut self,
        unmatched: &[Cluster],
        ts: Timestamp,
        dwell_count: u32,
    ) -> Vec<Track> {
        let mut new_tracks = Vec::new();

        for cluster in unmatched {
            if cluster.range > self.init_cfg.max_initiation_range {
                continue;
            }

            let mut matched = false;
            for ci in 0..self.candidates.len() {
                let cand = &self.candidates[ci];
                if cand.promoted {
                    continue;
                }
                let last = match cand.history.back() {
                    Some(last) => last,
                    None => continue,
                };

                let dr = (cluster.range - last.cluster.range).abs();
                let da = (cluster.azimuth - last.cluster.azimuth).abs();
                let de = (cluster.elevation - last.cluster.elevation).abs();

                let dt = (ts.saturating_sub(last.timestamp)) as f64 * 1e-6;
                let max_range_step = self.init_cfg.velocity_gate * dt + 100.0;

                if dr < max_range_step && da < 0.1 && de < 0.1 {
                    let cand = &mut self.candidates[ci];
                    cand.history.push_back(TentativeDetection {
                        cluster: cluster.clone(),
                        timestamp: ts,
                        dwell_count,
                    });
                    cand.hits += 1;
                    cand.total += 1;

                    if cand.hits >= self.init_cfg.m && cand.total <= self.init_cfg.n {
                        cand.promoted = true;

                        let len = cand.history.len();
                        let h1 = &cand.history[len - 1];
                        let h0 = &cand.history[len - 2];
                        let dt_init = (h1.timestamp.saturating_sub(h0.timestamp)) as f64 * 1e-6;
                        let x0 = Self::init_state(&h0.cluster, &h1.cluster, dt_init);

                        let p0 = self.init_covariance();
                        let id = self.next_track_id();
                        let track =
                            Track::new(id, x0, p0, self.initial_mode_probabilities, ts);

                        info!(
                            "New track {} at R={:.1} Az={:.3} El={:.3}",
                            id, cluster.range, cluster.azimuth, cluster.elevation
                        );
                        new_tracks.push(track);
                    }
                    matched = true;
                    break;
                }
            }

            if !matched {
                let mut history = VecDeque::new();
                history.push_back(TentativeDetection {
                    cluster: cluster.clone(),
                    timestamp: ts,
                    dwell_count,
                });
                self.candidates.push(InitiationCandidate {
                    history,
                    hits: 1,
                    total: 1,
                    promoted: false,
                });
            }
        }

        new_tracks
    }

    /// Drops candidates that are promoted, empty, outside the M-of-N window,
    /// or whose oldest sighting has aged out.
    pub fn purge_stale_candidates(&mut self, current_dwell: u32) {
        let m = self.init_cfg.m;
        let n = self.init_cfg.n;
        self.candidates.retain(|c| {
            if c.promoted {
                return false;
            }
            let first = match c.history.front() {
                Some(first) => first,
                None => return false,
            };
            if c.total >= n && c.hits < m {
                return false;
            }
            current_dwell.saturating_sub(first.dwell_count) <= n + 5
        });
    }

    pub fn num_candidates(&self) -> usize {
        self.candidates.len()
    }
}
