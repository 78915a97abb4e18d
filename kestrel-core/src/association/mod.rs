//! Measurement-to-track association.
//!
//! Three interchangeable strategies selected at construction time. All of
//! them gate on the squared Mahalanobis distance between a cluster's
//! Cartesian centroid and a track's predicted measurement, computed from
//! the track's *merged* IMM state and covariance. Tracks cross the
//! boundary as read-only slices; the output is index-based and resolved by
//! the track manager.

mod gnn;
mod jpda;
mod mahalanobis;

pub use gnn::GnnAssociator;
pub use jpda::JpdaAssociator;
pub use mahalanobis::MahalanobisAssociator;

use log::debug;

use crate::config::{AssociationConfig, AssociationMethod};
use crate::matrix::{measurement_matrix, MeasMatrix, MeasVector};
use crate::track::Track;
use crate::types::Cluster;

/// One accepted track–cluster pairing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub track_index: usize,
    pub cluster_index: usize,
    /// Squared Mahalanobis distance for NN/GNN; `1 − β` for JPDA
    pub distance: f64,
}

/// Result of associating one dwell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssociationOutput {
    pub matched: Vec<Match>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_clusters: Vec<usize>,
}

/// Measurement vector of a cluster: its Cartesian centroid.
fn cluster_measurement(c: &Cluster) -> MeasVector {
    MeasVector::new(c.cartesian.x, c.cartesian.y, c.cartesian.z)
}

/// Per-track gating context shared by all associators: `ẑ = H·x̄`,
/// `S = H·P̄·Hᵀ + R` and its inverse. `None` when S is singular.
fn track_gate(track: &Track, r: &MeasMatrix) -> Option<(MeasVector, MeasMatrix, f64)> {
    let h = measurement_matrix();
    let s = crate::matrix::innovation_covariance(&h, track.covariance(), r);
    let s_inv = crate::matrix::invert_innovation(&s)?;
    let z_pred = h * track.state();
    Some((z_pred, s_inv, s.determinant()))
}

/// Closed set of association strategies.
enum Associator {
    Mahalanobis(MahalanobisAssociator),
    Gnn(GnnAssociator),
    Jpda(JpdaAssociator),
}

impl Associator {
    fn associate(
        &self,
        tracks: &[Track],
        clusters: &[Cluster],
        r: &MeasMatrix,
    ) -> AssociationOutput {
        match self {
            Associator::Mahalanobis(a) => a.associate(tracks, clusters, r),
            Associator::Gnn(a) => a.associate(tracks, clusters, r),
            Associator::Jpda(a) => a.associate(tracks, clusters, r),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Associator::Mahalanobis(_) => "Mahalanobis",
            Associator::Gnn(_) => "GNN",
            Associator::Jpda(_) => "JPDA",
        }
    }
}

/// Runs the configured associator, short-circuiting degenerate dwells.
pub struct AssociationEngine {
    associator: Associator,
}

impl AssociationEngine {
    pub fn new(cfg: &AssociationConfig) -> Self {
        let associator = match cfg.method {
            AssociationMethod::Mahalanobis => Associator::Mahalanobis(
                MahalanobisAssociator::new(cfg.mahalanobis.clone(), cfg.gating_threshold),
            ),
            AssociationMethod::Gnn => {
                Associator::Gnn(GnnAssociator::new(cfg.gnn.clone(), cfg.gating_threshold))
            }
            AssociationMethod::Jpda => Associator::Jpda(JpdaAssociator::new(cfg.jpda.clone())),
        };
        AssociationEngine { associator }
    }

    pub fn process(
        &self,
        tracks: &[Track],
        clusters: &[Cluster],
        r: &MeasMatrix,
    ) -> AssociationOutput {
        if tracks.is_empty() || clusters.is_empty() {
            return AssociationOutput {
                matched: Vec::new(),
                unmatched_tracks: (0..tracks.len()).collect(),
                unmatched_clusters: (0..clusters.len()).collect(),
            };
        }

        let out = self.associator.associate(tracks, clusters, r);
        debug!(
            "{}: {} matched, {} unmatched tracks, {} unmatched clusters",
            self.associator.name(),
            out.matched.len(),
            out.unmatched_tracks.len(),
            out.unmatched_clusters.len()
        );
        out
    }

    pub fn method_name(&self) -> &'static str {
        self.associator.name()
    }
}
