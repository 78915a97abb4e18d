//! Global nearest neighbour association via reduced-cost assignment.

use crate::config::GnnConfig;
use crate::matrix::{mahalanobis_sq, MeasMatrix};
use crate::track::Track;
use crate::types::Cluster;

use super::{cluster_measurement, track_gate, AssociationOutput, Match};

/// Cost assigned to ungated pairs.
const UNGATED: f64 = 1e30;

/// Builds a gated cost matrix of squared Mahalanobis distances, reduces it
/// Munkres-style (row minima, then column minima), and resolves the
/// assignment with up to three greedy passes over the reduced costs.
/// An assignment is only accepted when its original cost stays below the
/// configured threshold.
pub struct GnnAssociator {
    config: GnnConfig,
    gating_threshold: f64,
}

impl GnnAssociator {
    pub fn new(config: GnnConfig, gating_threshold: f64) -> Self {
        GnnAssociator {
            config,
            gating_threshold,
        }
    }

    fn solve_assignment(&self, cost: &[Vec<f64>], n_tracks: usize, n_clusters: usize) -> Vec<Option<usize>> {
        let n = n_tracks.max(n_clusters);

        // Pad to square
        let mut reduced = vec![vec![UNGATED; n]; n];
        for i in 0..n_tracks {
            reduced[i][..n_clusters].copy_from_slice(&cost[i]);
        }

        // Row reduction
        for row in reduced.iter_mut() {
            let min = row.iter().cloned().fold(f64::INFINITY, f64::min);
            if min < UNGATED {
                for v in row.iter_mut() {
                    *v -= min;
                }
            }
        }

        // Column reduction
        for j in 0..n {
            let mut min = f64::INFINITY;
            for row in reduced.iter() {
                min = min.min(row[j]);
            }
            if min < UNGATED {
                for row in reduced.iter_mut() {
                    row[j] -= min;
                }
            }
        }

        // Greedy selection over the reduced matrix, repeated so that rows
        // beaten to their best column can settle for the next one
        let mut assignment: Vec<Option<usize>> = vec![None; n_tracks];
        let mut col_used = vec![false; n];

        for _pass in 0..3 {
            for i in 0..n_tracks {
                if assignment[i].is_some() {
                    continue;
                }
                let mut best = UNGATED;
                let mut best_j = None;
                for (j, used) in col_used.iter().enumerate().take(n_clusters) {
                    if *used {
                        continue;
                    }
                    if reduced[i][j] < best {
                        best = reduced[i][j];
                        best_j = Some(j);
                    }
                }
                if let Some(j) = best_j {
                    if cost[i][j] < self.config.cost_threshold {
                        assignment[i] = Some(j);
                        col_used[j] = true;
                    }
                }
            }
        }

        assignment
    }

    pub fn associate(
        &self,
        tracks: &[Track],
        clusters: &[Cluster],
        r: &MeasMatrix,
    ) -> AssociationOutput {
        let n_tracks = tracks.len();
        let n_clusters = clusters.len();

        let mut cost = vec![vec![UNGATED; n_clusters]; n_tracks];
        for (t, track) in tracks.iter().enumerate() {
            let (z_pred, s_inv, _) = match track_gate(track, r) {
                Some(gate) => gate,
                None => continue,
            };
            for (c, cluster) in clusters.iter().enumerate() {
                let innovation = cluster_measurement(cluster) - z_pred;
                let d2 = mahalanobis_sq(&innovation, &s_inv);
                if d2 <= self.gating_threshold {
                    cost[t][c] = d2;
                }
            }
        }

        let assignment = self.solve_assignment(&cost, n_tracks, n_clusters);

        let mut out = AssociationOutput::default();
        let mut cluster_taken = vec![false; n_clusters];

        for (t, assigned) in assignment.iter().enumerate() {
            match assigned {
                Some(c) => {
                    out.matched.push(Match {
                        track_index: t,
                        cluster_index: *c,
                        distance: cost[t][*c],
                    });
                    cluster_taken[*c] = true;
                }
                None => out.unmatched_tracks.push(t),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::tests::{cluster_at, track_at};
    use crate::matrix::measurement_noise;

    fn associator() -> GnnAssociator {
        GnnAssociator::new(
            GnnConfig {
                cost_threshold: 16.0,
            },
            16.0,
        )
    }

    #[test]
    fn test_one_to_one() {
        let tracks = vec![track_at(1, 1000.0, 0.0, 100.0)];
        let clusters = vec![cluster_at(1008.0, 0.0, 100.0)];
        let r = measurement_noise(25.0);

        let out = associator().associate(&tracks, &clusters, &r);
        assert_eq!(out.matched.len(), 1);
        assert!(out.unmatched_tracks.is_empty());
        assert!(out.unmatched_clusters.is_empty());
    }

    #[test]
    fn test_global_assignment_avoids_conflict() {
        // Track 0 is slightly nearer to cluster 1, but taking it would
        // orphan track 1; the assignment must remain one-to-one.
        let tracks = vec![
            track_at(1, 1000.0, 0.0, 100.0),
            track_at(2, 1030.0, 0.0, 100.0),
        ];
        let clusters = vec![
            cluster_at(1002.0, 0.0, 100.0),
            cluster_at(1028.0, 0.0, 100.0),
        ];
        let r = measurement_noise(25.0);

        let out = associator().associate(&tracks, &clusters, &r);
        assert_eq!(out.matched.len(), 2);

        let mut pairs: Vec<(usize, usize)> = out
            .matched
            .iter()
            .map(|m| (m.track_index, m.cluster_index))
            .collect();
        pairs.sort_unstable();
        assert_eq!(pairs, vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn test_more_tracks_than_clusters() {
        let tracks = vec![
            track_at(1, 1000.0, 0.0, 100.0),
            track_at(2, 3000.0, 500.0, 100.0),
        ];
        let clusters = vec![cluster_at(1004.0, 0.0, 100.0)];
        let r = measurement_noise(25.0);

        let out = associator().associate(&tracks, &clusters, &r);
        assert_eq!(out.matched.len(), 1);
        assert_eq!(out.matched[0].track_index, 0);
        assert_eq!(out.unmatched_tracks, vec![1]);
    }

    #[test]
    fn test_cost_threshold_rejects() {
        let a = GnnAssociator::new(
            GnnConfig {
                cost_threshold: 0.001,
            },
            16.0,
        );

        let tracks = vec![track_at(1, 1000.0, 0.0, 100.0)];
        let clusters = vec![cluster_at(1020.0, 0.0, 100.0)];
        let r = measurement_noise(25.0);

        let out = a.associate(&tracks, &clusters, &r);
        assert!(out.matched.is_empty());
        assert_eq!(out.unmatched_tracks, vec![0]);
        assert_eq!(out.unmatched_clusters, vec![0]);
    }
}
