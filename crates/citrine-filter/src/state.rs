//! Filter state: the estimate, its covariance, and step provenance.

use citrine_reactor::SimEvent;
use citrine_types::Timestamp;
use nalgebra::{DMatrix, DVector};

use crate::error::{FilterError, shape};

/// Identifies which observable drove a correction step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservedMarker {
    /// The full observation vector was consumed (`correct`).
    Full,
    /// Only scalar observable `j` was consumed (`correct1`).
    Scalar(usize),
}

/// Filter output at step `k`: the state estimate `x(k)` and its error
/// covariance `P(k)`.
#[derive(Debug, Clone, PartialEq)]
pub struct KalmanState {
    /// Step number; advances by one per filter step.
    k: u32,
    /// Time `t(k)`.
    tm: Timestamp,
    /// `[n x 1]` estimated state.
    x: DVector<f64>,
    /// `[n x n]` error covariance of `x`; symmetric positive semidefinite.
    p: DMatrix<f64>,
}

impl KalmanState {
    /// Fails with `DimMismatch` unless `P` is `[n x n]` for `n = x.len()`.
    pub fn new(
        k: u32,
        tm: Timestamp,
        x: DVector<f64>,
        p: DMatrix<f64>,
    ) -> Result<Self, FilterError> {
        let n = x.len();
        if p.nrows() != n || p.ncols() != n {
            return Err(FilterError::DimMismatch {
                ctx: "KalmanState covariance",
                expected: shape(n, n),
                actual: shape(p.nrows(), p.ncols()),
            });
        }

        Ok(Self { k, tm, x, p })
    }

    pub fn step_no(&self) -> u32 {
        self.k
    }

    pub fn tm(&self) -> Timestamp {
        self.tm
    }

    /// State-vector cardinality `n`.
    pub fn n_state(&self) -> usize {
        self.x.len()
    }

    pub fn state(&self) -> &DVector<f64> {
        &self.x
    }

    pub fn state_cov(&self) -> &DMatrix<f64> {
        &self.p
    }
}

/// A [`KalmanState`] augmented with the gain that produced it and a marker
/// identifying the observable that drove the step.
#[derive(Debug, Clone, PartialEq)]
pub struct KalmanStateExt {
    state: KalmanState,
    /// `[n x m]` gain for a full correction, `[n x 1]` for a scalar
    /// correction, `[0 x 0]` for an initial state.
    gain: DMatrix<f64>,
    observed: ObservedMarker,
}

impl KalmanStateExt {
    /// Fails with `DimMismatch` if a non-empty gain disagrees with the
    /// state cardinality (both gain dimensions are validated).
    pub fn new(
        state: KalmanState,
        gain: DMatrix<f64>,
        observed: ObservedMarker,
    ) -> Result<Self, FilterError> {
        if gain.nrows() > 0 && gain.ncols() > 0 {
            let n = state.n_state();
            let expected_cols = match observed {
                ObservedMarker::Scalar(_) => 1,
                ObservedMarker::Full => gain.ncols(),
            };
            if gain.nrows() != n || gain.ncols() != expected_cols {
                return Err(FilterError::DimMismatch {
                    ctx: "KalmanStateExt gain",
                    expected: shape(n, expected_cols),
                    actual: shape(gain.nrows(), gain.ncols()),
                });
            }
        }

        Ok(Self {
            state,
            gain,
            observed,
        })
    }

    /// Starting state for a filter: no gain has been applied yet.
    pub fn initial(tm: Timestamp, x: DVector<f64>, p: DMatrix<f64>) -> Result<Self, FilterError> {
        let state = KalmanState::new(0, tm, x, p)?;
        Ok(Self {
            state,
            gain: DMatrix::zeros(0, 0),
            observed: ObservedMarker::Full,
        })
    }

    pub fn state(&self) -> &KalmanState {
        &self.state
    }

    pub fn step_no(&self) -> u32 {
        self.state.step_no()
    }

    pub fn tm(&self) -> Timestamp {
        self.state.tm()
    }

    pub fn n_state(&self) -> usize {
        self.state.n_state()
    }

    pub fn gain(&self) -> &DMatrix<f64> {
        &self.gain
    }

    pub fn observed(&self) -> ObservedMarker {
        self.observed
    }
}

impl SimEvent for KalmanStateExt {
    fn tm(&self) -> Timestamp {
        self.state.tm()
    }
}
