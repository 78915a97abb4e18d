//! Grouping of preprocessed detections into cluster measurements.
//!
//! Three interchangeable algorithms selected at construction time. All of
//! them produce strength-weighted centroids: detection weights are linear
//! strength `10^(dBm/10)` normalized over the group, every aggregate except
//! `strength` is the weighted mean, and `strength` itself is the arithmetic
//! mean in dB.

mod dbscan;
mod range;
mod range_strength;

pub use dbscan::DbscanClusterer;
pub use range::RangeClusterer;
pub use range_strength::RangeStrengthClusterer;

use log::{debug, trace};

use crate::config::{ClusterConfig, ClusterMethod};
use crate::types::{spherical_to_cartesian, Cluster, Detection};

/// Builds the centroid cluster over `indices` into the detection slice.
///
/// The caller guarantees `indices` is non-empty.
fn build_cluster(detections: &[Detection], indices: &[usize], id: u32) -> Cluster {
    let linear_sum: f64 = indices
        .iter()
        .map(|&i| 10f64.powf(detections[i].strength / 10.0))
        .sum();

    let mut c = Cluster {
        cluster_id: id,
        num_detections: indices.len() as u32,
        detection_indices: indices.iter().map(|&i| i as u32).collect(),
        ..Cluster::default()
    };

    let mut strength_db_sum = 0.0;
    for &i in indices {
        let d = &detections[i];
        let w = 10f64.powf(d.strength / 10.0) / linear_sum;
        c.range += w * d.range;
        c.azimuth += w * d.azimuth;
        c.elevation += w * d.elevation;
        c.snr += w * d.snr;
        c.rcs += w * d.rcs;
        c.micro_doppler += w * d.micro_doppler;
        strength_db_sum += d.strength;
    }
    c.strength = strength_db_sum / indices.len() as f64;
    c
}

/// Closed set of clustering algorithms.
enum Clusterer {
    Dbscan(DbscanClusterer),
    Range(RangeClusterer),
    RangeStrength(RangeStrengthClusterer),
}

impl Clusterer {
    fn cluster(&self, detections: &[Detection]) -> Vec<Cluster> {
        match self {
            Clusterer::Dbscan(c) => c.cluster(detections),
            Clusterer::Range(c) => c.cluster(detections),
            Clusterer::RangeStrength(c) => c.cluster(detections),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Clusterer::Dbscan(_) => "DBSCAN",
            Clusterer::Range(_) => "Range",
            Clusterer::RangeStrength(_) => "RangeStrength",
        }
    }
}

/// Runs the configured clusterer and finalizes its output.
///
/// The engine owns the process-lifetime cluster id counter: algorithm-local
/// labels are overwritten with monotonically increasing ids, and the
/// Cartesian centroid is derived from the spherical mean here.
pub struct ClusterEngine {
    clusterer: Clusterer,
    next_cluster_id: u32,
}

impl ClusterEngine {
    pub fn new(cfg: &ClusterConfig) -> Self {
        let clusterer = match cfg.method {
            ClusterMethod::Dbscan => Clusterer::Dbscan(DbscanClusterer::new(cfg.dbscan.clone())),
            ClusterMethod::RangeBased => {
                Clusterer::Range(RangeClusterer::new(cfg.range_based.clone()))
            }
            ClusterMethod::RangeStrength => {
                Clusterer::RangeStrength(RangeStrengthClusterer::new(cfg.range_strength.clone()))
            }
        };
        trace!("Cluster engine using method {}", clusterer.name());
        ClusterEngine {
            clusterer,
            next_cluster_id: 0,
        }
    }

    /// Clusters one dwell of preprocessed detections.
    pub fn process(&mut self, detections: &[Detection]) -> Vec<Cluster> {
        if detections.is_empty() {
            return Vec::new();
        }

        let mut clusters = self.clusterer.cluster(detections);

        for c in clusters.iter_mut() {
            c.cluster_id = self.next_cluster_id;
            self.next_cluster_id += 1;
            c.cartesian = spherical_to_cartesian(c.range, c.azimuth, c.elevation);
        }

        debug!(
            "Clustering: {} detections -> {} clusters",
            detections.len(),
            clusters.len()
        );
        clusters
    }

    pub fn method_name(&self) -> &'static str {
        self.clusterer.name()
    }
}
