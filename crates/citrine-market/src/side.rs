//! Market sides and side-relative price comparison.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::price::Price;

/// Bid or ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Bid, Side::Ask];

    pub fn other(self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    /// Side-relative comparison, defined solely in terms of [`Price`]'s
    /// public order: `Greater` means `x` is more aggressive than `y` on
    /// this side (higher bid, lower ask), `Less` means it fades.
    pub fn compare_px(self, x: Price, y: Price) -> Ordering {
        match self {
            Side::Bid => x.cmp(&y),
            Side::Ask => y.cmp(&x),
        }
    }

    /// `x` is at least as aggressive as `y`.
    pub fn matches_or_improves(self, x: Price, y: Price) -> bool {
        self.compare_px(x, y) != Ordering::Less
    }

    /// `x` is strictly worse than `y`.
    pub fn fades(self, x: Price, y: Price) -> bool {
        self.compare_px(x, y) == Ordering::Less
    }

    /// Moves a value away from the market by `dy` (down for bids, up for
    /// asks).
    pub fn fade_by(self, px: f64, dy: f64) -> f64 {
        match self {
            Side::Bid => px - dy,
            Side::Ask => px + dy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "bid"),
            Side::Ask => write!(f, "ask"),
        }
    }
}
