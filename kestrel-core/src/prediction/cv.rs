//! Constant-velocity motion model.

use super::MotionModel;
use crate::config::CvConfig;
use crate::matrix::{StateMatrix, StateVector};

/// Constant velocity: position integrates velocity, acceleration is forced
/// to zero by the transition matrix itself.
#[derive(Debug, Clone)]
pub struct CvModel {
    config: CvConfig,
}

impl CvModel {
    pub fn new(config: CvConfig) -> Self {
        CvModel { config }
    }
}

impl MotionModel for CvModel {
    fn transition_matrix(&self, dt: f64, _x: &StateVector) -> StateMatrix {
        let mut f = StateMatrix::identity();
        for axis in 0..3 {
            let p = axis * 3;
            f[(p, p + 1)] = dt;
            // Zeroing the diagonal wipes any residual acceleration estimate
            f[(p + 2, p + 2)] = 0.0;
        }
        f
    }

    fn process_noise(&self, dt: f64) -> StateMatrix {
        let q = self.config.process_noise_std * self.config.process_noise_std;
        let dt2 = dt * dt;
        let dt3 = dt2 * dt / 2.0;
        let dt4 = dt2 * dt2 / 4.0;

        let mut qm = StateMatrix::zeros();
        for axis in 0..3 {
            let p = axis * 3;
            let v = p + 1;
            qm[(p, p)] = dt4 * q;
            qm[(p, v)] = dt3 * q;
            qm[(v, p)] = dt3 * q;
            qm[(v, v)] = dt2 * q;
            qm[(p + 2, p + 2)] = q * 0.01;
        }
        qm
    }

    fn name(&self) -> &'static str {
        "CV"
    }
}
