//! Transition and observation models, and the observation event.

use citrine_reactor::SimEvent;
use citrine_types::Timestamp;
use nalgebra::{DMatrix, DVector};

use crate::error::{FilterError, shape};

/// Transition behavior for one step: `x_(k+1) = F·x_(k) + w`, `w ~ N(0, Q)`.
#[derive(Debug, Clone, PartialEq)]
pub struct KalmanTransition {
    /// `[n x n]` state transition matrix.
    f: DMatrix<f64>,
    /// `[n x n]` system-noise covariance; symmetric positive semidefinite.
    q: DMatrix<f64>,
}

impl KalmanTransition {
    pub fn new(f: DMatrix<f64>, q: DMatrix<f64>) -> Result<Self, FilterError> {
        let n = f.nrows();
        if f.ncols() != n {
            return Err(FilterError::DimMismatch {
                ctx: "KalmanTransition F",
                expected: shape(n, n),
                actual: shape(f.nrows(), f.ncols()),
            });
        }
        if q.nrows() != n || q.ncols() != n {
            return Err(FilterError::DimMismatch {
                ctx: "KalmanTransition Q",
                expected: shape(n, n),
                actual: shape(q.nrows(), q.ncols()),
            });
        }

        Ok(Self { f, q })
    }

    /// State cardinality `n`.
    pub fn n_state(&self) -> usize {
        self.f.nrows()
    }

    pub fn transition_mat(&self) -> &DMatrix<f64> {
        &self.f
    }

    pub fn transition_cov(&self) -> &DMatrix<f64> {
        &self.q
    }
}

/// Observation behavior for one step: `z(k) = H·x_(k) + v`, `v ~ N(0, R)`.
#[derive(Debug, Clone, PartialEq)]
pub struct KalmanObservable {
    /// `[m x n]` observation (coupling) matrix.
    h: DMatrix<f64>,
    /// `[m x m]` observation-noise covariance; symmetric positive
    /// semidefinite.
    r: DMatrix<f64>,
}

impl KalmanObservable {
    pub fn new(h: DMatrix<f64>, r: DMatrix<f64>) -> Result<Self, FilterError> {
        let m = h.nrows();
        if r.nrows() != m || r.ncols() != m {
            return Err(FilterError::DimMismatch {
                ctx: "KalmanObservable R",
                expected: shape(m, m),
                actual: shape(r.nrows(), r.ncols()),
            });
        }

        Ok(Self { h, r })
    }

    /// State cardinality `n`.
    pub fn n_state(&self) -> usize {
        self.h.ncols()
    }

    /// Observation cardinality `m`.
    pub fn n_observable(&self) -> usize {
        self.h.nrows()
    }

    pub fn observable(&self) -> &DMatrix<f64> {
        &self.h
    }

    pub fn observable_cov(&self) -> &DMatrix<f64> {
        &self.r
    }
}

/// One observation event: the vector `z(k+1)` stamped with `t(k+1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct KalmanInput {
    tm: Timestamp,
    /// `[m x 1]` observation vector.
    z: DVector<f64>,
}

impl KalmanInput {
    pub fn new(tm: Timestamp, z: DVector<f64>) -> Self {
        Self { tm, z }
    }

    pub fn tm(&self) -> Timestamp {
        self.tm
    }

    /// Observation cardinality `m` (may vary from step to step).
    pub fn n_obs(&self) -> usize {
        self.z.len()
    }

    pub fn z(&self) -> &DVector<f64> {
        &self.z
    }
}

impl SimEvent for KalmanInput {
    fn tm(&self) -> Timestamp {
        self.tm
    }
}
