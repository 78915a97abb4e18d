//! DBSCAN clustering over scaled spherical coordinates.

use crate::config::DbscanConfig;
use crate::types::{Cluster, Detection};

use super::build_cluster;

/// Point label during the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Undefined,
    Noise,
    Cluster(usize),
}

/// Density-based clustering with per-axis epsilon scaling.
///
/// The neighbourhood distance is
/// `√((Δr/ε_r)² + (Δaz/ε_az)² + (Δel/ε_el)²)` and a point is a neighbour
/// when that distance is at most 1. Noise points are not discarded; they
/// come out as singleton clusters so that nothing vanishes between
/// preprocessing and association.
#[derive(Debug, Clone)]
pub struct DbscanClusterer {
    config: DbscanConfig,
}

impl DbscanClusterer {
    pub fn new(config: DbscanConfig) -> Self {
        DbscanClusterer { config }
    }

    fn distance(&self, a: &Detection, b: &Detection) -> f64 {
        let dr = (a.range - b.range) / self.config.epsilon_range;
        let da = (a.azimuth - b.azimuth) / self.config.epsilon_azimuth;
        let de = (a.elevation - b.elevation) / self.config.epsilon_elevation;
        (dr * dr + da * da + de * de).sqrt()
    }

    fn neighbours(&self, detections: &[Detection], idx: usize) -> Vec<usize> {
        (0..detections.len())
            .filter(|&i| self.distance(&detections[idx], &detections[i]) <= 1.0)
            .collect()
    }

    pub fn cluster(&self, detections: &[Detection]) -> Vec<Cluster> {
        let n = detections.len();
        if n == 0 {
            return Vec::new();
        }

        let mut labels = vec![Label::Undefined; n];
        let mut groups: Vec<Vec<usize>> = Vec::new();

        for i in 0..n {
            if labels[i] != Label::Undefined {
                continue;
            }

            let neighbours = self.neighbours(detections, i);
            if neighbours.len() < self.config.min_points {
                labels[i] = Label::Noise;
                continue;
            }

            let current = groups.len();
            labels[i] = Label::Cluster(current);
            groups.push(vec![i]);

            // Seeded BFS expansion
            let mut seeds = neighbours;
            let mut si = 0;
            while si < seeds.len() {
                let q = seeds[si];
                si += 1;

                if labels[q] == Label::Noise {
                    labels[q] = Label::Cluster(current);
                    groups[current].push(q);
                }
                if labels[q] != Label::Undefined {
                    continue;
                }

                labels[q] = Label::Cluster(current);
                groups[current].push(q);

                let q_neighbours = self.neighbours(detections, q);
                if q_neighbours.len() >= self.config.min_points {
                    for nn in q_neighbours {
                        if matches!(labels[nn], Label::Undefined | Label::Noise) {
                            seeds.push(nn);
                        }
                    }
                }
            }
        }

        // Core clusters first, then noise points as singletons with labels
        // continuing past the last core label
        let mut result: Vec<Cluster> = Vec::with_capacity(groups.len());
        for (label, mut indices) in groups.into_iter().enumerate() {
            indices.sort_unstable();
            result.push(build_cluster(detections, &indices, label as u32));
        }
        let mut next = result.len() as u32;
        for i in 0..n {
            if labels[i] == Label::Noise {
                result.push(build_cluster(detections, &[i], next));
                next += 1;
            }
        }

        result
    }
}
