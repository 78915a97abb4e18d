//! Coordinated-turn-rate motion model.

use super::MotionModel;
use crate::config::CtrConfig;
use crate::matrix::{StateMatrix, StateVector};

/// Turn rates below this degrade the model to constant velocity.
const MIN_TURN_RATE: f64 = 1e-6;

/// Coordinated turn in the x–y plane with constant-velocity z.
///
/// The turn rate is not a state; it is re-estimated from the current
/// velocity and acceleration as `ω = (vx·ay − vy·ax) / (vx² + vy²)` before
/// every prediction. Two instances (CTR1, CTR2) with different noise
/// levels sit in the IMM bank.
#[derive(Debug, Clone)]
pub struct CtrModel {
    config: CtrConfig,
    label: &'static str,
}

impl CtrModel {
    pub fn new(config: CtrConfig, label: &'static str) -> Self {
        CtrModel { config, label }
    }

    fn estimate_turn_rate(x: &StateVector) -> f64 {
        let (vx, vy) = (x[1], x[4]);
        let (ax, ay) = (x[2], x[5]);
        let v2 = vx * vx + vy * vy;
        if v2 < 1e-6 {
            return 0.0;
        }
        (vx * ay - vy * ax) / v2
    }
}

impl MotionModel for CtrModel {
    fn transition_matrix(&self, dt: f64, x: &StateVector) -> StateMatrix {
        let omega = Self::estimate_turn_rate(x);
        let mut f = StateMatrix::identity();

        if omega.abs() < MIN_TURN_RATE {
            // Straight-line limit of the turn kinematics
            f[(0, 1)] = dt;
            f[(3, 4)] = dt;
            f[(6, 7)] = dt;
            f[(2, 2)] = 0.0;
            f[(5, 5)] = 0.0;
            f[(8, 8)] = 0.0;
        } else {
            let sin_ot = (omega * dt).sin();
            let cos_ot = (omega * dt).cos();

            f[(0, 1)] = sin_ot / omega;
            f[(0, 4)] = -(1.0 - cos_ot) / omega;
            f[(1, 1)] = cos_ot;
            f[(1, 4)] = -sin_ot;
            f[(3, 1)] = (1.0 - cos_ot) / omega;
            f[(3, 4)] = sin_ot / omega;
            f[(4, 1)] = sin_ot;
            f[(4, 4)] = cos_ot;

            // z is untouched by the turn
            f[(6, 7)] = dt;

            f[(2, 2)] = 0.5;
            f[(5, 5)] = 0.5;
            f[(8, 8)] = 0.0;
        }

        f
    }

    fn process_noise(&self, dt: f64) -> StateMatrix {
        let q = self.config.process_noise_std * self.config.process_noise_std;
        let q_omega = self.config.turn_rate_noise_std * self.config.turn_rate_noise_std;
        let dt2 = dt * dt;
        let dt3 = dt2 * dt;

        let mut qm = StateMatrix::zeros();
        for axis in 0..3 {
            let p = axis * 3;
            let v = p + 1;
            let a = p + 2;

            // Turn-rate noise feeds the horizontal axes only
            let qa = if axis < 2 { q + q_omega } else { q };

            qm[(p, p)] = dt3 / 3.0 * qa;
            qm[(p, v)] = dt2 / 2.0 * qa;
            qm[(v, p)] = dt2 / 2.0 * qa;
            qm[(v, v)] = dt * qa;
            qm[(a, a)] = qa * 0.1;
        }
        qm
    }

    fn name(&self) -> &'static str {
        self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> CtrModel {
        CtrModel::new(CtrConfig::default(), "CTR1")
    }

    #[test]
    fn test_zero_turn_rate_degrades_to_cv() {
        let mut x = StateVector::zeros();
        x[1] = 10.0; // straight along x, no acceleration

        let (xp, _) = model().predict(&x, &StateMatrix::identity(), 1.0);
        assert!((xp[0] - 10.0).abs() < 1e-12);
        assert!(xp[3].abs() < 1e-12);
        assert!((xp[1] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_quarter_turn() {
        // vx = 10, centripetal ay -> omega = ay / vx = 0.1 rad/s
        let mut x = StateVector::zeros();
        x[1] = 10.0;
        x[5] = 1.0;

        let omega: f64 = 0.1;
        let dt = std::f64::consts::FRAC_PI_2 / omega; // quarter revolution

        let (xp, _) = model().predict(&x, &StateMatrix::identity(), dt);

        // Velocity vector rotates a quarter turn: (10, 0) -> (0, 10)
        assert!(xp[1].abs() < 1e-9);
        assert!((xp[4] - 10.0).abs() < 1e-6);

        // Displacement for the exact discrete kinematics
        assert!((xp[0] - (omega * dt).sin() / omega * 10.0).abs() < 1e-6);
        assert!((xp[3] - (1.0 - (omega * dt).cos()) / omega * 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_z_is_constant_velocity_during_turn() {
        let mut x = StateVector::zeros();
        x[1] = 10.0;
        x[5] = 1.0; // turning
        x[7] = 3.0; // climbing

        let (xp, _) = model().predict(&x, &StateMatrix::identity(), 2.0);
        assert!((xp[6] - 6.0).abs() < 1e-12);
        assert!((xp[7] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_turn_rate_estimate() {
        let mut x = StateVector::zeros();
        x[1] = 10.0;
        x[5] = 2.0;
        assert!((CtrModel::estimate_turn_rate(&x) - 0.02).abs() < 1e-12);

        // Stationary target: no meaningful turn rate
        let x0 = StateVector::zeros();
        assert_eq!(CtrModel::estimate_turn_rate(&x0), 0.0);
    }
}
