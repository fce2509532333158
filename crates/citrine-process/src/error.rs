//! Process-construction errors.

use citrine_types::SimDuration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessError {
    /// Sampling intervals and bridge spans must be strictly positive.
    #[error("interval must be strictly positive, got {interval}")]
    NonPositiveInterval { interval: SimDuration },

    /// Volatility is a standard deviation; negative values are meaningless.
    #[error("volatility must be non-negative, got {volatility}")]
    NegativeVolatility { volatility: f64 },

    /// Log-space processes require a strictly positive scale.
    #[error("scale must be strictly positive, got {scale}")]
    NonPositiveScale { scale: f64 },
}
