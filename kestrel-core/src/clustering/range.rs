//! Greedy range-ordered clustering.

use crate::config::RangeBasedConfig;
use crate::types::{Cluster, Detection};

use super::build_cluster;

/// Sorts detections by range and greedily grows a group from each
/// unassigned point, accepting later points that pass the axis gates.
/// The forward scan stops once the range gap alone exceeds the gate, which
/// the sort order makes safe.
#[derive(Debug, Clone)]
pub struct RangeClusterer {
    config: RangeBasedConfig,
}

impl RangeClusterer {
    pub fn new(config: RangeBasedConfig) -> Self {
        RangeClusterer { config }
    }

    fn in_gate(&self, a: &Detection, b: &Detection) -> bool {
        (a.range - b.range).abs() <= self.config.range_gate_size
            && (a.azimuth - b.azimuth).abs() <= self.config.azimuth_gate_size
            && (a.elevation - b.elevation).abs() <= self.config.elevation_gate_size
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

    fn clusterer() -> RangeClusterer {
        RangeClusterer::new(RangeBasedConfig {
            range_gate_size: 75.0,
            azimuth_gate_size: 0.03,
            elevation_gate_size: 0.03,
        })
    }

    #[test]
    fn test_groups_within_gates() {
        let dets = vec![
            det(1000.0, 0.00, 0.10, -60.0),
            det(1050.0, 0.01, 0.10, -61.0),
            det(1500.0, 0.00, 0.10, -62.0),
        ];
        let clusters = clusterer().cluster(&dets);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].num_detections, 2);
        assert_eq!(clusters[1].num_detections, 1);
    }

    #[test]
    fn test_azimuth_gate_splits() {
        let dets = vec![
            det(1000.0, 0.00, 0.10, -60.0),
            det(1010.0, 0.20, 0.10, -60.0), // same range band, way off in azimuth
        ];
        let clusters = clusterer().cluster(&dets);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn test_unsorted_input_handled() {
        let dets = vec![
            det(5000.0, 1.0, 0.2, -60.0),
            det(1000.0, 0.0, 0.1, -60.0),
            det(1040.0, 0.0, 0.1, -60.0),
        ];
        let clusters = clusterer().cluster(&dets);
        assert_eq!(clusters.len(), 2);

        // The near pair groups together despite arriving out of order
        let pair = clusters.iter().find(|c| c.num_detections == 2).unwrap();
        assert!(pair.range < 1100.0);
        assert!(pair.detection_indices.contains(&1));
        assert!(pair.detection_indices.contains(&2));
    }

    #[test]
    fn test_seed_wins_iteration_order() {
        // Both seeds could gate the middle point; the nearer-range seed
        // opens its group first and takes it
        let dets = vec![
            det(1000.0, 0.0, 0.1, -60.0),
            det(1060.0, 0.0, 0.1, -60.0),
            det(1120.0, 0.0, 0.1, -60.0),
        ];
        let clusters = clusterer().cluster(&dets);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].detection_indices, vec![0, 1]);
        assert_eq!(clusters[1].detection_indices, vec![2]);
    }
}
