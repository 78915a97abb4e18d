//! Greedy nearest-neighbour association on Mahalanobis distance.

use crate::config::MahalanobisConfig;
use crate::matrix::{mahalanobis_sq, MeasMatrix};
use crate::track::Track;
use crate::types::Cluster;

use super::{cluster_measurement, track_gate, AssociationOutput, Match};

/// Enumerates every gated (track, cluster) pair, sorts by distance and
/// greedily accepts pairs while neither side is taken.
pub struct MahalanobisAssociator {
    config: MahalanobisConfig,
    gating_threshold: f64,
}

impl MahalanobisAssociator {
    pub fn new(config: MahalanobisConfig, gating_threshold: f64) -> Self {
        MahalanobisAssociator {
            config,
            gating_threshold,
        }
    }

    pub fn associate(
        &self,
        tracks: &[Track],
        clusters: &[Cluster],
        r: &MeasMatrix,
    ) -> AssociationOutput {
        struct Candidate {
            track_index: usize,
            cluster_index: usize,
            distance: f64,
        }

        let mut candidates = Vec::new();
        for (t, track) in tracks.iter().enumerate() {
            let (z_pred, s_inv, _) = match track_gate(track, r) {
                Some(gate) => gate,
                None => continue,
            };

            for (c, cluster) in clusters.iter().enumerate() {
                let innovation = cluster_measurement(cluster) - z_pred;
                let d2 = mahalanobis_sq(&innovation, &s_inv);
                if d2 <= self.gating_threshold {
                    candidates.push(Candidate {
                        track_index: t,
                        cluster_index: c,
                        distance: d2,
                    });
                }
            }
        }

        // Stable sort keeps the lower-index pair first on exact ties
        candidates.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut track_taken = vec![false; tracks.len()];
        let mut cluster_taken = vec![false; clusters.len()];
        let mut out = AssociationOutput::default();

        for cand in &candidates {
            if track_taken[cand.track_index] || cluster_taken[cand.cluster_index] {
                continue;
            }
            if cand.distance <= self.config.distance_threshold {
                out.matched.push(Match {
                    track_index: cand.track_index,
                    cluster_index: cand.cluster_index,
                    distance: cand.distance,
                });
                track_taken[cand.track_index] = true;
                cluster_taken[cand.cluster_index] = true;
            }
        }

        for (t, taken) in track_taken.iter().enumerate() {
            if !taken {
                out.unmatched_tracks.push(t);
            }
        }
        for (c, taken) in cluster_taken.iter().enumerate() {
            if !taken {
                out.unmatched_clusters.push(c);
            }
        }

        out
    }
}
