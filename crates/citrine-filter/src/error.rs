//! Filter errors.

use thiserror::Error;

/// Errors from Kalman filter construction and stepping.
///
/// Dimension contracts are enforced at construction and at every engine
/// entry point; they are fatal at the call site and propagate to the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// Matrix/vector shapes are incompatible.
    #[error("dimension mismatch in {ctx}: expected {expected}, got {actual}")]
    DimMismatch {
        ctx: &'static str,
        expected: String,
        actual: String,
    },

    /// Scalar-observable index out of range.
    #[error("observable index {j} out of range for {m} observables")]
    ObservableOutOfRange { j: usize, m: usize },

    /// The innovation covariance `M = H·P·Hᵀ + R` could not be inverted,
    /// even after a small diagonal correction.
    #[error("innovation covariance is singular")]
    SingularInnovation,
}

/// Shorthand for shape strings in error messages, e.g. `[3x2]`.
pub(crate) fn shape(rows: usize, cols: usize) -> String {
    format!("[{rows}x{cols}]")
}
