//! Market-model errors.

use citrine_process::ProcessError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarketError {
    /// Strike grids need at least one strictly positive, strictly
    /// increasing strike.
    #[error("invalid strike grid: n={n}, lo_strike={lo_strike}, d_strike={d_strike}")]
    InvalidStrikeGrid {
        n: u32,
        lo_strike: f64,
        d_strike: f64,
    },

    /// A call/put pair disagrees on side, strike, or expiry.
    #[error("broken call/put pair at strike {strike}")]
    BrokenStrikePair { strike: f64 },

    /// A tick arrived for an option outside the book's strike set.
    #[error("unknown option {id} in market-data tick")]
    UnknownOption { id: crate::option::OptionId },

    /// Underlying process/tracer construction failed.
    #[error(transparent)]
    Process(#[from] ProcessError),
}
