//! Range clustering with an additional strength gate.

use crate::config::RangeStrengthConfig;
use crate::types::{Cluster, Detection};

use super::build_cluster;

/// Same greedy range-ordered scan as [`super::RangeClusterer`], with one
/// extra gate on |Δstrength| so returns of very different amplitude stay
/// separate even when they overlap spatially.
#[derive(Debug, Clone)]
pub struct RangeStrengthClusterer {
    config: RangeStrengthConfig,
}

impl RangeStrengthClusterer {
    pub fn new(config: RangeStrengthConfig) -> Self {
        RangeStrengthClusterer { config }
    }

    fn in_gate(&self, a: &Detection, b: &Detection) -> bool {
        (a.range - b.range).abs() <= self.config.range_gate_size
            && (a.azimuth - b.azimuth).abs() <= self.config.azimuth_gate_size
            && (a.elevation - b.elevation).abs() <= self.config.elevation_gate_size
            && (a.strength - b.strength).abs() <= self.config.strength_gate_size
    }

    pub fn cluster(&self, detections: &[Detection]) -> Vec<Cluster> {
        let n = detections.len();
        if n == 0 {
            return Vec::new();
        }

        let mut sorted: Vec<usize> = (0..n).collect();
        sorted.sort_by(|&a, &b| {
            detections[a]
                .range
                .partial_cmp(&detections[b].range)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut assigned = vec![false; n];
        let mut result = Vec::new();
        let mut cid = 0u32;

        for si in 0..n {
            let i = sorted[si];
            if assigned[i] {
                continue;
            }

            let mut group = vec![i];
            assigned[i] = true;

            for &j in &sorted[si + 1..] {
                if assigned[j] {
                    continue;
                }
                if detections[j].range - detections[i].range > self.config.range_gate_size {
                    break;
                }
                if self.in_gate(&detections[i], &detections[j]) {
                    group.push(j);
                    assigned[j] = true;
                }
            }

            result.push(build_cluster(detections, &group, cid));
            cid += 1;
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::tests::det;

    fn clusterer() -> RangeStrengthClusterer {
        RangeStrengthClusterer::new(RangeStrengthConfig {
            range_gate_size: 75.0,
            azimuth_gate_size: 0.03,
            elevation_gate_size: 0.03,
            strength_gate_size: 6.0,
        })
    }

    #[test]
    fn test_strength_gate_splits_colocated_returns() {
        let dets = vec![
            det(1000.0, 0.0, 0.1, -60.0),
            det(1010.0, 0.0, 0.1, -80.0), // spatially in gate, 20 dB apart
        ];
        let clusters = clusterer().cluster(&dets);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn test_similar_strength_groups() {
        let dets = vec![
            det(1000.0, 0.0, 0.1, -60.0),
            det(1010.0, 0.0, 0.1, -63.0),
        ];
        let clusters = clusterer().cluster(&dets);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].num_detections, 2);
    }
}
