//! Constant-acceleration motion model.

use super::MotionModel;
use crate::config::CaConfig;
use crate::matrix::{StateMatrix, StateVector};

/// Full constant-acceleration kinematics with a configurable per-step decay
/// on the acceleration states. Two instances (CA1, CA2) with different
/// noise levels sit in the IMM bank.
#[derive(Debug, Clone)]
pub struct CaModel {
    config: CaConfig,
    label: &'static str,
}

impl CaModel {
    pub fn new(config: CaConfig, label: &'static str) -> Self {
        CaModel { config, label }
    }
}

impl MotionModel for CaModel {
    fn transition_matrix(&self, dt: f64, _x: &StateVector) -> StateMatrix {
        let dt2 = 0.5 * dt * dt;
        let decay = self.config.accel_decay_rate;

        let mut f = StateMatrix::identity();
        for axis in 0..3 {
            let p = axis * 3;
            f[(p, p + 1)] = dt;
            f[(p, p + 2)] = dt2;
            f[(p + 1, p + 2)] = dt;
            f[(p + 2, p + 2)] = decay;
        }
        f
    }

    fn process_noise(&self, dt: f64) -> StateMatrix {
        let q = self.config.process_noise_std * self.config.process_noise_std;
        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        let dt4 = dt3 * dt;
        let dt5 = dt4 * dt;

        let mut qm = StateMatrix::zeros();
        for axis in 0..3 {
            let p = axis * 3;
            let v = p + 1;
            let a = p + 2;
            qm[(p, p)] = dt5 / 20.0 * q;
            qm[(p, v)] = dt4 / 8.0 * q;
            qm[(p, a)] = dt3 / 6.0 * q;
            qm[(v, p)] = dt4 / 8.0 * q;
            qm[(v, v)] = dt3 / 3.0 * q;
            qm[(v, a)] = dt2 / 2.0 * q;
            qm[(a, p)] = dt3 / 6.0 * q;
            qm[(a, v)] = dt2 / 2.0 * q;
            qm[(a, a)] = dt * q;
        }
        qm
    }

    fn name(&self) -> &'static str {
        self.label
    }
}
