//! Fixed-size linear algebra for the 9-D kinematic state.
//!
//! The state vector layout is `[x, vx, ax, y, vy, ay, z, vz, az]`; the
//! measurement is Cartesian position `[x, y, z]`. All matrices are
//! stack-allocated `nalgebra` types, no heap allocation anywhere in the
//! filter hot path.

use nalgebra::{SMatrix, SVector};

/// Dimension of the kinematic state vector.
pub const STATE_DIM: usize = 9;
/// Dimension of the Cartesian position measurement.
pub const MEAS_DIM: usize = 3;

/// Determinants below this are treated as singular.
pub const SINGULAR_DET_EPS: f64 = 1e-30;

pub type StateVector = SVector<f64, STATE_DIM>;
pub type StateMatrix = SMatrix<f64, STATE_DIM, STATE_DIM>;
pub type MeasVector = SVector<f64, MEAS_DIM>;
pub type MeasMatrix = SMatrix<f64, MEAS_DIM, MEAS_DIM>;
/// Observation matrix H (3x9).
pub type ObsMatrix = SMatrix<f64, MEAS_DIM, STATE_DIM>;
/// Kalman gain K (9x3).
pub type GainMatrix = SMatrix<f64, STATE_DIM, MEAS_DIM>;

/// The constant observation matrix selecting `[x, y, z]` out of the state.
pub fn measurement_matrix() -> ObsMatrix {
    let mut h = ObsMatrix::zeros();
    h[(0, 0)] = 1.0;
    h[(1, 3)] = 1.0;
    h[(2, 6)] = 1.0;
    h
}

/// Diagonal measurement noise with the given per-axis standard deviation.
pub fn measurement_noise(sigma: f64) -> MeasMatrix {
    MeasMatrix::from_diagonal(&MeasVector::from_element(sigma * sigma))
}

/// Inverts the innovation covariance, treating near-singular matrices as
/// degenerate.
///
/// Returns `None` when `|det S| < SINGULAR_DET_EPS` or the inversion itself
/// fails; callers skip the affected model or pair in that case.
pub fn invert_innovation(s: &MeasMatrix) -> Option<MeasMatrix> {
    if s.determinant().abs() < SINGULAR_DET_EPS {
        return None;
    }
    s.try_inverse()
}

/// Squared Mahalanobis distance `yᵀ S⁻¹ y` of an innovation.
pub fn mahalanobis_sq(innovation: &MeasVector, s_inv: &MeasMatrix) -> f64 {
    (innovation.transpose() * s_inv * innovation)[(0, 0)]
}

/// Innovation covariance `S = H·P·Hᵀ + R` for a state covariance P.
pub fn innovation_covariance(h: &ObsMatrix, p: &StateMatrix, r: &MeasMatrix) -> MeasMatrix {
    h * p * h.transpose() + r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_matrix_selects_position() {
        let h = measurement_matrix();
        let mut x = StateVector::zeros();
        x[0] = 10.0;
        x[1] = 1.0; // vx must not leak through
        x[3] = 20.0;
        x[6] = 30.0;

        let z = h * x;
        assert_eq!(z[0], 10.0);
        assert_eq!(z[1], 20.0);
        assert_eq!(z[2], 30.0);
    }

    #[test]
    fn test_measurement_noise_diagonal() {
        let r = measurement_noise(25.0);
        for i in 0..MEAS_DIM {
            for j in 0..MEAS_DIM {
                let expected = if i == j { 625.0 } else { 0.0 };
                assert_eq!(r[(i, j)], expected);
            }
        }
    }

    #[test]
    fn test_invert_innovation_identity() {
        let s = MeasMatrix::identity() * 4.0;
        let s_inv = invert_innovation(&s).unwrap();
        assert!((s_inv[(0, 0)] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_invert_innovation_singular() {
        let s = MeasMatrix::zeros();
        assert!(invert_innovation(&s).is_none());
    }

    #[test]
    fn test_mahalanobis() {
        let s_inv = MeasMatrix::identity();
        let y = MeasVector::new(3.0, 4.0, 0.0);
        assert!((mahalanobis_sq(&y, &s_inv) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_innovation_covariance_shape() {
        let h = measurement_matrix();
        let p = StateMatrix::identity() * 2.0;
        let r = measurement_noise(1.0);
        let s = innovation_covariance(&h, &p, &r);
        // H P H' picks the position variances, so S = 2 I + 1 I
        for i in 0..MEAS_DIM {
            assert!((s[(i, i)] - 3.0).abs() < 1e-12);
        }
    }
}
