//! Physical-envelope gating of raw detections.

use log::debug;

use crate::config::PreprocessConfig;
use crate::types::Detection;

/// Stateless per-detection validity check against the configured envelopes.
///
/// Accepted detections keep their input order; the running rejected count
/// is the only state carried across dwells.
pub struct Preprocessor {
    config: PreprocessConfig,
    rejected: u64,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Preprocessor {
            config,
            rejected: 0,
        }
    }

    fn is_valid(&self, d: &Detection) -> bool {
        let c = &self.config;
        d.range >= c.min_range
            && d.range <= c.max_range
            && d.azimuth >= c.min_azimuth
            && d.azimuth <= c.max_azimuth
            && d.elevation >= c.min_elevation
            && d.elevation <= c.max_elevation
            && d.snr >= c.min_snr
            && d.snr <= c.max_snr
            && d.rcs >= c.min_rcs
            && d.rcs <= c.max_rcs
            && d.strength >= c.min_strength
            && d.strength <= c.max_strength
    }

    /// Drops out-of-envelope detections, preserving the order of the rest.
    pub fn process(&mut self, raw: &[Detection]) -> Vec<Detection> {
        let mut accepted = Vec::with_capacity(raw.len());
        let mut rejected_now = 0u64;

        for d in raw {
            if self.is_valid(d) {
                accepted.push(*d);
            } else {
                rejected_now += 1;
            }
        }

        self.rejected += rejected_now;
        debug!(
            "Preprocess: {} in, {} passed, {} rejected",
            raw.len(),
            accepted.len(),
            rejected_now
        );
        accepted
    }

    /// Total detections rejected over the process lifetime.
    pub fn rejected_count(&self) -> u64 {
        self.rejected
    }
}
