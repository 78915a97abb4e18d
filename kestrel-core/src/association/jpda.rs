//! Joint probabilistic data association with hard strongest-β assignment.

use crate::config::JpdaConfig;
use crate::matrix::{mahalanobis_sq, MeasMatrix};
use crate::track::Track;
use crate::types::Cluster;

use super::{cluster_measurement, track_gate, AssociationOutput, Match};

/// Association weights for one track.
#[derive(Debug, Clone)]
pub struct JpdaWeights {
    pub track_index: usize,
    /// Probability that none of the gated clusters originated from the track
    pub beta_zero: f64,
    /// (cluster index, β) for each gated cluster
    pub cluster_weights: Vec<(usize, f64)>,
}

/// Computes per-track association probabilities over the gated clusters
/// and resolves each track to its strongest candidate.
///
/// The posterior weights are exactly the JPDA singles: with detection
/// probability `p_d`, clutter density `λ` and gated likelihoods `ℓ_c`,
/// `β₀ = (1−p_d)·λ / D` and `β_c = p_d·ℓ_c / D`. The full weighted state
/// update is deliberately not applied; the strongest β decides the hard
/// pairing, and `β₀ > 0.5` (or an empty gate set) leaves the track
/// unmatched.
pub struct JpdaAssociator {
    config: JpdaConfig,
}

impl JpdaAssociator {
    pub fn new(config: JpdaConfig) -> Self {
        JpdaAssociator { config }
    }

    /// Posterior association weights for every track.
    pub fn compute_weights(
        &self,
        tracks: &[Track],
        clusters: &[Cluster],
        r: &MeasMatrix,
    ) -> Vec<JpdaWeights> {
        let p_d = self.config.detection_probability;
        let lambda = self.config.clutter_density;
        let norm = (2.0 * std::f64::consts::PI).powi(3);

        let mut all = Vec::with_capacity(tracks.len());

        for (t, track) in tracks.iter().enumerate() {
            let (z_pred, s_inv, det_s) = match track_gate(track, r) {
                Some(gate) => gate,
                None => {
                    all.push(JpdaWeights {
                        track_index: t,
                        beta_zero: 1.0,
                        cluster_weights: Vec::new(),
                    });
                    continue;
                }
            };

            let mut gated: Vec<(usize, f64)> = Vec::new();
            for (c, cluster) in clusters.iter().enumerate() {
                let innovation = cluster_measurement(cluster) - z_pred;
                let d2 = mahalanobis_sq(&innovation, &s_inv);
                if d2 <= self.config.gate_size {
                    let likelihood = (-0.5 * d2).exp() / (norm * det_s.abs()).sqrt();
                    gated.push((c, likelihood));
                }
            }

            if gated.is_empty() {
                all.push(JpdaWeights {
                    track_index: t,
                    beta_zero: 1.0,
                    cluster_weights: Vec::new(),
                });
                continue;
            }

            let sum_lik: f64 = gated.iter().map(|(_, l)| p_d * l).sum();
            let denom = (1.0 - p_d) * lambda + sum_lik;

            if denom < 1e-30 {
                all.push(JpdaWeights {
                    track_index: t,
                    beta_zero: 1.0,
                    cluster_weights: Vec::new(),
                });
                continue;
            }

            all.push(JpdaWeights {
                track_index: t,
                beta_zero: (1.0 - p_d) * lambda / denom,
                cluster_weights: gated
                    .into_iter()
                    .map(|(c, l)| (c, p_d * l / denom))
                    .collect(),
            });
        }

        all
    }

    pub fn associate(
        &self,
        tracks: &[Track],
        clusters: &[Cluster],
        r: &MeasMatrix,
    ) -> AssociationOutput {
        let weights = self.compute_weights(tracks, clusters, r);

        let mut out = AssociationOutput::default();
        let mut cluster_taken = vec![false; clusters.len()];

        for w in &weights {
            if w.cluster_weights.is_empty() || w.beta_zero > 0.5 {
                out.unmatched_tracks.push(w.track_index);
                continue;
            }

            // Strongest β wins; strict > keeps the lower index on ties
            let mut best_beta = 0.0;
            let mut best_cluster = None;
            for &(c, beta) in &w.cluster_weights {
                if beta > best_beta {
                    best_beta = beta;
                    best_cluster = Some(c);
                }
            }

            match best_cluster {
                Some(c) => {
                    out.matched.push(Match {
                        track_index: w.track_index,
                        cluster_index: c,
                        distance: 1.0 - best_beta,
                    });
                    cluster_taken[c] = true;
                }
                None => out.unmatched_tracks.push(w.track_index),
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

    fn associator() -> JpdaAssociator {
        JpdaAssociator::new(JpdaConfig {
            gate_size: 16.0,
            clutter_density: 1e-6,
            detection_probability: 0.9,
        })
    }

    #[test]
    fn test_single_clear_association() {
        let tracks = vec![track_at(1, 1000.0, 0.0, 100.0)];
        let clusters = vec![cluster_at(1005.0, 0.0, 100.0)];
        let r = measurement_noise(25.0);

        let out = associator().associate(&tracks, &clusters, &r);
        assert_eq!(out.matched.len(), 1);
        assert_eq!(out.matched[0].cluster_index, 0);
        // Pseudo-distance 1 − β is small for a confident pairing
        assert!(out.matched[0].distance < 0.5);
    }

    #[test]
    fn test_strongest_beta_selected() {
        let tracks = vec![track_at(1, 1000.0, 0.0, 100.0)];
        let clusters = vec![
            cluster_at(1030.0, 0.0, 100.0),
            cluster_at(1003.0, 0.0, 100.0), // much closer
        ];
        let r = measurement_noise(25.0);

        let weights = associator().compute_weights(&tracks, &clusters, &r);
        assert_eq!(weights.len(), 1);
        let w = &weights[0];
        assert_eq!(w.cluster_weights.len(), 2);

        let beta_sum: f64 = w.cluster_weights.iter().map(|(_, b)| b).sum::<f64>() + w.beta_zero;
        assert!((beta_sum - 1.0).abs() < 1e-9);

        let out = associator().associate(&tracks, &clusters, &r);
        assert_eq!(out.matched[0].cluster_index, 1);
        assert_eq!(out.unmatched_clusters, vec![0]);
    }

    #[test]
    fn test_empty_gate_set_unmatched() {
        let tracks = vec![track_at(1, 1000.0, 0.0, 100.0)];
        let clusters = vec![cluster_at(8000.0, 4000.0, 100.0)];
        let r = measurement_noise(25.0);

        let out = associator().associate(&tracks, &clusters, &r);
        assert!(out.matched.is_empty());
        assert_eq!(out.unmatched_tracks, vec![0]);
        assert_eq!(out.unmatched_clusters, vec![0]);
    }

    #[test]
    fn test_beta_zero_dominates_when_detection_unlikely() {
        // p_d near zero with heavy clutter: the no-detection hypothesis
        // wins and the track stays unmatched
        let a = JpdaAssociator::new(JpdaConfig {
            gate_size: 16.0,
            clutter_density: 1.0,
            detection_probability: 0.01,
        });
        let tracks = vec![track_at(1, 1000.0, 0.0, 100.0)];
        let clusters = vec![cluster_at(1005.0, 0.0, 100.0)];
        let r = measurement_noise(25.0);

        let out = a.associate(&tracks, &clusters, &r);
        assert!(out.matched.is_empty());
        assert_eq!(out.unmatched_tracks, vec![0]);
    }
}
