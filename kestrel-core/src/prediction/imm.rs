//! Interacting Multiple Model estimator.
//!
//! Fixed five-model bank in the order (CV, CA1, CA2, CTR1, CTR2) with a
//! configured Markov transition matrix. The filter itself is stateless per
//! track: it operates on an [`ImmState`] borrowed from the track manager
//! and never retains it.

use log::{debug, trace};

use super::{CaModel, CtrModel, CvModel, MotionModel};
use crate::config::PredictionConfig;
use crate::matrix::{
    invert_innovation, mahalanobis_sq, measurement_matrix, MeasMatrix, MeasVector, StateMatrix,
    StateVector,
};

/// Size of the model bank. Compile-time constant; the config's `numModels`
/// field is not consulted.
pub const IMM_NUM_MODELS: usize = 5;

/// Mode probabilities below this total trigger a reset to uniform.
const LIKELIHOOD_UNDERFLOW: f64 = 1e-30;
/// Predicted mode probabilities below this make mixing ill-defined.
const MIXING_EPS: f64 = 1e-15;
/// Likelihood assigned when the innovation covariance is degenerate.
const LIKELIHOOD_FLOOR: f64 = 1e-30;

/// Per-track state of the IMM estimator.
///
/// Invariant: after every `predict` or `update` the merged estimate equals
/// the mode-probability-weighted mixture of the per-model estimates, and
/// the mode probabilities form a simplex.
#[derive(Debug, Clone)]
pub struct ImmState {
    pub model_states: [StateVector; IMM_NUM_MODELS],
    pub model_covariances: [StateMatrix; IMM_NUM_MODELS],
    pub mode_probabilities: [f64; IMM_NUM_MODELS],
    pub merged_state: StateVector,
    pub merged_covariance: StateMatrix,
}

impl ImmState {
    /// Initializes every model with the same state and covariance.
    pub fn new(
        x0: StateVector,
        p0: StateMatrix,
        mode_probabilities: [f64; IMM_NUM_MODELS],
    ) -> Self {
        ImmState {
            model_states: [x0; IMM_NUM_MODELS],
            model_covariances: [p0; IMM_NUM_MODELS],
            mode_probabilities,
            merged_state: x0,
            merged_covariance: p0,
        }
    }

    /// Recomputes the merged estimate as the probability-weighted mixture
    /// of the per-model estimates.
    pub fn merge(&mut self) {
        let mut merged = StateVector::zeros();
        for m in 0..IMM_NUM_MODELS {
            merged += self.model_states[m] * self.mode_probabilities[m];
        }
        self.merged_state = merged;

        let mut cov = StateMatrix::zeros();
        for m in 0..IMM_NUM_MODELS {
            let diff = self.model_states[m] - merged;
            cov += (self.model_covariances[m] + diff * diff.transpose())
                * self.mode_probabilities[m];
        }
        self.merged_covariance = cov;
    }
}

/// The IMM filter: model bank plus mode transition matrix.
pub struct ImmFilter {
    models: [ModelBankEntry; IMM_NUM_MODELS],
    transition: [[f64; IMM_NUM_MODELS]; IMM_NUM_MODELS],
}

/// Closed set of motion models that can sit in the bank.
enum ModelBankEntry {
    Cv(CvModel),
    Ca(CaModel),
    Ctr(CtrModel),
}

impl ModelBankEntry {
    fn as_model(&self) -> &dyn MotionModel {
        match self {
            ModelBankEntry::Cv(m) => m,
            ModelBankEntry::Ca(m) => m,
            ModelBankEntry::Ctr(m) => m,
        }
    }
}

impl ImmFilter {
    pub fn new(cfg: &PredictionConfig) -> Self {
        let models = [
            ModelBankEntry::Cv(CvModel::new(cfg.cv.clone())),
            ModelBankEntry::Ca(CaModel::new(cfg.ca1.clone(), "CA1")),
            ModelBankEntry::Ca(CaModel::new(cfg.ca2.clone(), "CA2")),
            ModelBankEntry::Ctr(CtrModel::new(cfg.ctr1.clone(), "CTR1")),
            ModelBankEntry::Ctr(CtrModel::new(cfg.ctr2.clone(), "CTR2")),
        ];

        let names: Vec<&str> = models.iter().map(|m| m.as_model().name()).collect();
        debug!("IMM bank: {}", names.join(", "));

        ImmFilter {
            models,
            transition: cfg.imm.transition_matrix,
        }
    }

    /// Predicted mode probabilities `c̄_j = Σ_i π_ij·μ_i`.
    fn predicted_mode_probabilities(&self, state: &ImmState) -> [f64; IMM_NUM_MODELS] {
        let mut c_bar = [0.0; IMM_NUM_MODELS];
        for (j, c) in c_bar.iter_mut().enumerate() {
            for i in 0..IMM_NUM_MODELS {
                *c += self.transition[i][j] * state.mode_probabilities[i];
            }
        }
        c_bar
    }

    /// Mixes the per-model estimates into the initial conditions each model
    /// starts its prediction from.
    fn interaction(&self, state: &mut ImmState) {
        let c_bar = self.predicted_mode_probabilities(state);

        let mut mix = [[0.0; IMM_NUM_MODELS]; IMM_NUM_MODELS];
        for i in 0..IMM_NUM_MODELS {
            for j in 0..IMM_NUM_MODELS {
                mix[i][j] = if c_bar[j] > MIXING_EPS {
                    self.transition[i][j] * state.mode_probabilities[i] / c_bar[j]
                } else if i == j {
                    1.0
                } else {
                    0.0
                };
            }
        }

        let mut mixed_states = [StateVector::zeros(); IMM_NUM_MODELS];
        for (j, xj) in mixed_states.iter_mut().enumerate() {
            for i in 0..IMM_NUM_MODELS {
                *xj += state.model_states[i] * mix[i][j];
            }
        }

        let mut mixed_covs = [StateMatrix::zeros(); IMM_NUM_MODELS];
        for (j, pj) in mixed_covs.iter_mut().enumerate() {
            for i in 0..IMM_NUM_MODELS {
                let diff = state.model_states[i] - mixed_states[j];
                *pj += (state.model_covariances[i] + diff * diff.transpose()) * mix[i][j];
            }
        }

        state.model_states = mixed_states;
        state.model_covariances = mixed_covs;
    }

    /// Advances the state by `dt`: interaction, per-model prediction, merge.
    pub fn predict(&self, dt: f64, state: &mut ImmState) {
        self.interaction(state);

        for m in 0..IMM_NUM_MODELS {
            let (x, p) = self.models[m].as_model().predict(
                &state.model_states[m],
                &state.model_covariances[m],
                dt,
            );
            state.model_states[m] = x;
            state.model_covariances[m] = p;
        }

        state.merge();

        trace!(
            "IMM predict dt={:.4} probs={:?}",
            dt,
            state.mode_probabilities
        );
    }

    /// Gaussian measurement likelihood of model `m`. A degenerate
    /// innovation covariance yields the floor value.
    fn model_likelihood(
        &self,
        m: usize,
        state: &ImmState,
        z: &MeasVector,
        r: &MeasMatrix,
    ) -> f64 {
        let h = measurement_matrix();
        let z_pred = h * state.model_states[m];
        let innovation = z - z_pred;
        let s = h * state.model_covariances[m] * h.transpose() + r;

        let det_s = s.determinant();
        if det_s < LIKELIHOOD_FLOOR {
            return LIKELIHOOD_FLOOR;
        }
        let s_inv = match s.try_inverse() {
            Some(inv) => inv,
            None => return LIKELIHOOD_FLOOR,
        };

        let d2 = mahalanobis_sq(&innovation, &s_inv);
        let log_lik =
            -0.5 * (3.0 * (2.0 * std::f64::consts::PI).ln() + det_s.ln() + d2);
        log_lik.exp()
    }

    /// Bayes update of the mode probabilities: `μ_j ∝ Λ_j·c̄_j`, with a
    /// reset to uniform when the total likelihood underflows.
    fn update_mode_probabilities(&self, state: &mut ImmState, z: &MeasVector, r: &MeasMatrix) {
        let mut likelihoods = [0.0; IMM_NUM_MODELS];
        for (m, lik) in likelihoods.iter_mut().enumerate() {
            *lik = self.model_likelihood(m, state, z, r);
        }

        let c_bar = self.predicted_mode_probabilities(state);

        let mut total = 0.0;
        for j in 0..IMM_NUM_MODELS {
            state.mode_probabilities[j] = likelihoods[j] * c_bar[j];
            total += state.mode_probabilities[j];
        }

        if total > LIKELIHOOD_UNDERFLOW {
            for p in state.mode_probabilities.iter_mut() {
                *p /= total;
            }
        } else {
            state.mode_probabilities = [1.0 / IMM_NUM_MODELS as f64; IMM_NUM_MODELS];
        }
    }

    /// Incorporates a Cartesian position measurement with noise `r`.
    ///
    /// Models whose innovation covariance is singular are skipped; the
    /// track stays consistent on whatever models still updated.
    pub fn update(&self, state: &mut ImmState, z: &MeasVector, r: &MeasMatrix) {
        let h = measurement_matrix();

        for m in 0..IMM_NUM_MODELS {
            let z_pred = h * state.model_states[m];
            let innovation = z - z_pred;

            let s = h * state.model_covariances[m] * h.transpose() + r;
            let s_inv = match invert_innovation(&s) {
                Some(inv) => inv,
                None => continue,
            };

            let gain = state.model_covariances[m] * h.transpose() * s_inv;
            state.model_states[m] += gain * innovation;
            state.model_covariances[m] =
                (StateMatrix::identity() - gain * h) * state.model_covariances[m];
        }

        self.update_mode_probabilities(state, z, r);
        state.merge();

        trace!("IMM update probs={:?}", state.mode_probabilities);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::measurement_noise;

    fn filter() -> ImmFilter {
        ImmFilter::new(&PredictionConfig::default())
    }

    fn initial_state() -> ImmState {
        let mut x0 = StateVector::zeros();
        x0[0] = 1000.0;
        x0[1] = 10.0;
        let p0 = StateMatrix::from_diagonal_element(100.0);
        ImmState::new(x0, p0, [0.4, 0.15, 0.15, 0.15, 0.15])
    }

    fn assert_simplex(state: &ImmState) {
        let sum: f64 = state.mode_probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "mode probabilities sum {}", sum);
        assert!(state.mode_probabilities.iter().all(|p| *p >= 0.0));
    }

    fn assert_merged_is_mixture(state: &ImmState) {
        let mut expected = StateVector::zeros();
        for m in 0..IMM_NUM_MODELS {
            expected += state.model_states[m] * state.mode_probabilities[m];
        }
        for i in 0..9 {
            let scale = expected[i].abs().max(1.0);
            assert!((state.merged_state[i] - expected[i]).abs() < 1e-9 * scale);
        }
    }

    fn assert_covariance_sane(state: &ImmState) {
        let p = &state.merged_covariance;
        for i in 0..9 {
            assert!(p[(i, i)] >= 0.0, "negative variance at {}", i);
            for j in 0..9 {
                let scale = p[(i, j)].abs().max(1.0);
                assert!(
                    (p[(i, j)] - p[(j, i)]).abs() < 1e-6 * scale,
                    "asymmetry at ({}, {})",
                    i,
                    j
                );
            }
        }
    }

    #[test]
    fn test_predict_preserves_invariants() {
        let f = filter();
        let mut state = initial_state();

        for _ in 0..10 {
            f.predict(0.1, &mut state);
            assert_simplex(&state);
            assert_merged_is_mixture(&state);
            assert_covariance_sane(&state);
        }
        // 10 dwells at 10 m/s: merged x near 1010
        assert!((state.merged_state[0] - 1010.0).abs() < 5.0);
    }

    #[test]
    fn test_update_pulls_toward_measurement() {
        let f = filter();
        let mut state = initial_state();
        let r = measurement_noise(25.0);

        f.predict(0.1, &mut state);
        let z = MeasVector::new(1005.0, 20.0, 5.0);
        f.update(&mut state, &z, &r);

        assert_simplex(&state);
        assert_merged_is_mixture(&state);
        assert_covariance_sane(&state);

        // Estimate moves toward the measurement in y
        assert!(state.merged_state[3] > 0.0);
        assert!(state.merged_state[3] < 20.0);
    }

    #[test]
    fn test_update_reduces_position_uncertainty() {
        let f = filter();
        let mut state = initial_state();
        let r = measurement_noise(25.0);

        f.predict(0.1, &mut state);
        let before = state.merged_covariance[(0, 0)];
        let z = MeasVector::new(1001.0, 0.0, 0.0);
        f.update(&mut state, &z, &r);
        assert!(state.merged_covariance[(0, 0)] < before);
    }

    #[test]
    fn test_singular_s_skips_model_update() {
        let f = filter();
        let mut state = initial_state();

        // Zero measurement noise and zero covariance make S singular
        for cov in state.model_covariances.iter_mut() {
            *cov = StateMatrix::zeros();
        }
        state.merge();
        let before = state.model_states;

        let z = MeasVector::new(2000.0, 0.0, 0.0);
        f.update(&mut state, &z, &MeasMatrix::zeros());

        // All model updates skipped: states untouched, probabilities reset
        // to a valid simplex by the underflow path
        for m in 0..IMM_NUM_MODELS {
            assert_eq!(state.model_states[m], before[m]);
        }
        assert_simplex(&state);
    }

    #[test]
    fn test_likelihood_underflow_resets_uniform() {
        let f = filter();
        let mut state = initial_state();
        let r = measurement_noise(1.0);

        f.predict(0.1, &mut state);
        // Measurement absurdly far away: every model likelihood floors
        let z = MeasVector::new(1e9, 1e9, 1e9);
        f.update(&mut state, &z, &r);

        for p in state.mode_probabilities {
            assert!((p - 0.2).abs() < 1e-9);
        }
    }

    #[test]
    fn test_mode_probabilities_favor_cv_for_straight_motion() {
        let f = filter();
        let mut state = initial_state();
        let r = measurement_noise(25.0);

        // Straight constant-velocity target at 10 m/s along x
        for k in 1..=20 {
            f.predict(0.1, &mut state);
            let z = MeasVector::new(1000.0 + k as f64, 0.0, 0.0);
            f.update(&mut state, &z, &r);
        }

        assert_simplex(&state);
        // CV should not have collapsed
        assert!(state.mode_probabilities[0] > 0.1);
    }
}
