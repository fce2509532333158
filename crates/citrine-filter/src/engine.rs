//! The stateless filter engine.
//!
//! Pure functions over the data model: each returns a fresh state and never
//! mutates its inputs. `correct` consumes the full observation vector;
//! `correct1` consumes a single scalar observable `j`, which is cheaper and
//! exact when the observation errors are uncorrelated (`R` diagonal).

use citrine_types::Timestamp;
use nalgebra::{DMatrix, DVector};

use crate::error::{FilterError, shape};
use crate::model::{KalmanInput, KalmanObservable, KalmanTransition};
use crate::spec::KalmanStep;
use crate::state::{KalmanState, KalmanStateExt, ObservedMarker};

/// Relative size of the diagonal correction applied when the innovation
/// covariance is not numerically positive definite.
const DIAGONAL_JITTER: f64 = 1e-12;

/// Propagates state and covariance from `t(k)` to `t(k+1)`, before any
/// observation is taken into account:
///
/// ```text
///   x(k+1|k) = F·x(k)
///   P(k+1|k) = F·P(k)·Fᵀ + Q
/// ```
pub fn extrapolate(
    tkp1: Timestamp,
    sk: &KalmanState,
    model: &KalmanTransition,
) -> Result<KalmanState, FilterError> {
    let f = model.transition_mat();
    let q = model.transition_cov();

    if f.ncols() != sk.n_state() {
        return Err(FilterError::DimMismatch {
            ctx: "extrapolate F·x",
            expected: shape(f.nrows(), sk.n_state()),
            actual: shape(f.nrows(), f.ncols()),
        });
    }

    let x_ext = f * sk.state();
    let p_ext = f * sk.state_cov() * f.transpose() + q;

    KalmanState::new(sk.step_no() + 1, tkp1, x_ext, p_ext)
}

/// Full Kalman gain for the step `t(k) → t(k+1)`:
///
/// ```text
///   M(k+1) = H·P(k+1|k)·Hᵀ + R          (symmetric)
///   K(k+1) = P(k+1|k)·Hᵀ·M(k+1)⁻¹      [n x m]
/// ```
pub fn kalman_gain(
    skp1_ext: &KalmanState,
    obs: &KalmanObservable,
) -> Result<DMatrix<f64>, FilterError> {
    let h = obs.observable();
    let r = obs.observable_cov();
    let p_ext = skp1_ext.state_cov();

    let n = h.ncols();
    if p_ext.nrows() != n || p_ext.ncols() != n {
        return Err(FilterError::DimMismatch {
            ctx: "kalman_gain P",
            expected: shape(n, n),
            actual: shape(p_ext.nrows(), p_ext.ncols()),
        });
    }

    let m = h * p_ext * h.transpose() + r;
    let m_inv = invert_innovation_cov(&m)?;

    Ok(p_ext * h.transpose() * m_inv)
}

/// Gain for the single observable `j`: row `H[j,·]` and diagonal element
/// `R[j,j]` project the filter onto a one-observable filter, whose scalar
/// innovation covariance inverts trivially:
///
/// ```text
///   m    = Hj·P(k+1|k)·Hjᵀ + R[j,j]
///   K(j) = P(k+1|k)·Hjᵀ / m             [n x 1]
/// ```
///
/// Exact when `R` is diagonal; otherwise the off-diagonal elements of row
/// `j` are deliberately ignored.
pub fn kalman_gain1(
    skp1_ext: &KalmanState,
    obs: &KalmanObservable,
    j: usize,
) -> Result<DVector<f64>, FilterError> {
    let m_obs = obs.n_observable();
    if j >= m_obs {
        return Err(FilterError::ObservableOutOfRange { j, m: m_obs });
    }

    let h = obs.observable();
    let r = obs.observable_cov();
    let p_ext = skp1_ext.state_cov();

    let n = h.ncols();
    if p_ext.nrows() != n || p_ext.ncols() != n {
        return Err(FilterError::DimMismatch {
            ctx: "kalman_gain1 P",
            expected: shape(n, n),
            actual: shape(p_ext.nrows(), p_ext.ncols()),
        });
    }

    let hj_t: DVector<f64> = h.row(j).transpose();
    let p_hj_t = p_ext * &hj_t;
    let m = hj_t.dot(&p_hj_t) + r[(j, j)];

    Ok(p_hj_t / m)
}

/// Corrects the extrapolated state for the full observation vector:
///
/// ```text
///   innov  = z − H·x(k+1|k)
///   x(k+1) = x(k+1|k) + K·innov
///   P(k+1) = (I − K·H)·P(k+1|k)
/// ```
///
/// The returned covariance is re-symmetrized (`½(P + Pᵀ)`) to shed the
/// asymmetry that finite-precision accumulation introduces.
pub fn correct(
    skp1_ext: &KalmanState,
    obs: &KalmanObservable,
    input: &KalmanInput,
) -> Result<KalmanStateExt, FilterError> {
    let h = obs.observable();
    let z = input.z();

    if z.len() != h.nrows() {
        return Err(FilterError::DimMismatch {
            ctx: "correct z",
            expected: shape(h.nrows(), 1),
            actual: shape(z.len(), 1),
        });
    }

    let n = skp1_ext.n_state();
    let gain = kalman_gain(skp1_ext, obs)?;

    let innov = z - h * skp1_ext.state();
    let x = skp1_ext.state() + &gain * innov;
    let p = (DMatrix::identity(n, n) - &gain * h) * skp1_ext.state_cov();

    let state = KalmanState::new(skp1_ext.step_no(), skp1_ext.tm(), x, symmetrize(p))?;
    KalmanStateExt::new(state, gain, ObservedMarker::Full)
}

/// Corrects the extrapolated state for scalar observable `j` only: a
/// rank-1 covariance update using [`kalman_gain1`].
pub fn correct1(
    skp1_ext: &KalmanState,
    obs: &KalmanObservable,
    input: &KalmanInput,
    j: usize,
) -> Result<KalmanStateExt, FilterError> {
    let h = obs.observable();
    let z = input.z();

    if z.len() != h.nrows() {
        return Err(FilterError::DimMismatch {
            ctx: "correct1 z",
            expected: shape(h.nrows(), 1),
            actual: shape(z.len(), 1),
        });
    }

    let n = skp1_ext.n_state();
    let kj = kalman_gain1(skp1_ext, obs, j)?;
    let hj = h.row(j);

    let innov_j = z[j] - (hj * skp1_ext.state())[(0, 0)];
    let x = skp1_ext.state() + &kj * innov_j;

    // Kj·Hj is [n x n] with rank 1
    let p = (DMatrix::identity(n, n) - &kj * hj) * skp1_ext.state_cov();

    let state = KalmanState::new(skp1_ext.step_no(), skp1_ext.tm(), x, symmetrize(p))?;
    KalmanStateExt::new(state, DMatrix::from_column_slice(n, 1, kj.as_slice()), ObservedMarker::Scalar(j))
}

/// One full step `t(k) → t(k+1)`: extrapolate, then correct for the whole
/// observation vector.
pub fn step(
    sk: &KalmanState,
    model: &KalmanTransition,
    obs: &KalmanObservable,
    input: &KalmanInput,
) -> Result<KalmanStateExt, FilterError> {
    let skp1_ext = extrapolate(input.tm(), sk, model)?;
    correct(&skp1_ext, obs, input)
}

/// One step consuming only scalar observable `j`.
pub fn step1(
    sk: &KalmanState,
    model: &KalmanTransition,
    obs: &KalmanObservable,
    input: &KalmanInput,
    j: usize,
) -> Result<KalmanStateExt, FilterError> {
    let skp1_ext = extrapolate(input.tm(), sk, model)?;
    correct1(&skp1_ext, obs, input, j)
}

/// [`step`] over a packaged [`KalmanStep`].
pub fn run_step(step_spec: &KalmanStep) -> Result<KalmanStateExt, FilterError> {
    step(
        step_spec.state(),
        step_spec.model(),
        step_spec.obs(),
        step_spec.input(),
    )
}

/// [`step1`] over a packaged [`KalmanStep`].
pub fn run_step1(step_spec: &KalmanStep, j: usize) -> Result<KalmanStateExt, FilterError> {
    step1(
        step_spec.state(),
        step_spec.model(),
        step_spec.obs(),
        step_spec.input(),
        j,
    )
}

// ============================================================================
// Numerics
// ============================================================================

fn symmetrize(p: DMatrix<f64>) -> DMatrix<f64> {
    (&p + p.transpose()) * 0.5
}

/// Inverts the innovation covariance `M`.
///
/// `M` is symmetric and, unless observation errors are perfectly
/// correlated, positive definite — so a Cholesky factorization is the
/// first choice. Finite precision can leave `M` only semidefinite; in that
/// case a small diagonal correction is added (equivalent to marginally
/// noisier observations) and the factorization retried, with a dense LU
/// solve as the last resort.
fn invert_innovation_cov(m: &DMatrix<f64>) -> Result<DMatrix<f64>, FilterError> {
    if let Some(chol) = m.clone().cholesky() {
        return Ok(chol.inverse());
    }

    let dim = m.nrows();
    let jitter = DIAGONAL_JITTER * (m.trace().abs() / dim as f64).max(f64::MIN_POSITIVE);

    let mut corrected = m.clone();
    for i in 0..dim {
        corrected[(i, i)] += jitter;
    }

    tracing::warn!(
        jitter,
        dim,
        "innovation covariance not positive definite; applying diagonal correction"
    );

    if let Some(chol) = corrected.clone().cholesky() {
        return Ok(chol.inverse());
    }

    tracing::warn!(dim, "diagonal correction insufficient; falling back to LU solve");

    corrected
        .lu()
        .try_inverse()
        .ok_or(FilterError::SingularInnovation)
}
