//! Target dynamics: motion models and the IMM estimator.

mod ca;
mod ctr;
mod cv;
mod imm;

pub use ca::CaModel;
pub use ctr::CtrModel;
pub use cv::CvModel;
pub use imm::{ImmFilter, ImmState, IMM_NUM_MODELS};

use crate::matrix::{StateMatrix, StateVector};

/// A linear(ized) motion model over the 9-D kinematic state.
///
/// Models advance an estimate as `x' = F(dt, x)·x`,
/// `P' = F·P·Fᵀ + Q(dt)`. The transition matrix may depend on the current
/// state (the coordinated-turn model linearizes around its estimated turn
/// rate), the process noise only on the time step.
pub trait MotionModel {
    /// State transition matrix for time step `dt`.
    fn transition_matrix(&self, dt: f64, x: &StateVector) -> StateMatrix;

    /// Process noise covariance for time step `dt`.
    fn process_noise(&self, dt: f64) -> StateMatrix;

    /// Short model name for diagnostics.
    fn name(&self) -> &'static str;

    /// Advances one estimate by `dt`.
    fn predict(&self, x: &StateVector, p: &StateMatrix, dt: f64) -> (StateVector, StateMatrix) {
        let f = self.transition_matrix(dt, x);
        let q = self.process_noise(dt);
        (f * x, f * p * f.transpose() + q)
    }
}
