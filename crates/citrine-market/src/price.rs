//! Exact price representation, bid/ask pairs, and tick-size regimes.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use crate::side::Side;

/// A price with exact representation: integer multiples of $0.0001.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Price(i64);

impl Price {
    pub const ZERO: Price = Price(0);

    /// Representation units per dollar.
    const UNITS: f64 = 10_000.0;

    pub fn from_f64(px: f64) -> Self {
        Self((px * Self::UNITS).round() as i64)
    }

    pub const fn from_units(units: i64) -> Self {
        Self(units)
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / Self::UNITS
    }
}

impl Add for Price {
    type Output = Price;

    fn add(self, rhs: Self) -> Price {
        Price(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Price;

    fn sub(self, rhs: Self) -> Price {
        Price(self.0 - rhs.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.to_f64())
    }
}

/// Order size, in contracts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Size(u32);

impl Size {
    pub const fn new(n: u32) -> Self {
        Self(n)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tick-size regimes
// ============================================================================

/// Minimum price increment rules for listed options. Regimes with two
/// bands switch to the coarser tick at the $3.00 threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pxtick {
    /// $0.01 everywhere.
    AllPenny,
    /// $0.01 below $3.00, $0.05 at and above.
    PennyNickel,
    /// $0.05 below $3.00, $0.10 at and above.
    NickelDime,
}

/// Band threshold shared by the two-band regimes.
const BAND_THRESHOLD: Price = Price::from_units(3_0000);

const PENNY: i64 = 100;
const NICKEL: i64 = 500;
const DIME: i64 = 1_000;

impl Pxtick {
    /// Tick size applying at (around) price `px`.
    fn tick_units(self, px: Price) -> i64 {
        let coarse = px >= BAND_THRESHOLD;
        match (self, coarse) {
            (Pxtick::AllPenny, _) => PENNY,
            (Pxtick::PennyNickel, false) => PENNY,
            (Pxtick::PennyNickel, true) => NICKEL,
            (Pxtick::NickelDime, false) => NICKEL,
            (Pxtick::NickelDime, true) => DIME,
        }
    }

    /// Greatest tick multiple at or below `px`.
    pub fn glb_tick(self, px: f64) -> Price {
        let raw = Price::from_f64(px);
        let tick = self.tick_units(raw);
        Price(raw.0.div_euclid(tick) * tick)
    }

    /// Least tick multiple at or above `px`.
    pub fn lub_tick(self, px: f64) -> Price {
        let raw = Price::from_f64(px);
        let tick = self.tick_units(raw);
        Price(-((-raw.0).div_euclid(tick)) * tick)
    }
}

// ============================================================================
// Bid/ask pairs
// ============================================================================

/// A bid/ask price pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Px2 {
    bid: Price,
    ask: Price,
}

impl Px2 {
    pub fn new(bid: Price, ask: Price) -> Self {
        Self { bid, ask }
    }

    pub fn bid_px(&self) -> Price {
        self.bid
    }

    pub fn ask_px(&self) -> Price {
        self.ask
    }

    pub fn px(&self, side: Side) -> Price {
        match side {
            Side::Bid => self.bid,
            Side::Ask => self.ask,
        }
    }

    pub fn set_px(&mut self, side: Side, px: Price) {
        match side {
            Side::Bid => self.bid = px,
            Side::Ask => self.ask = px,
        }
    }

    pub fn spread(&self) -> Price {
        self.ask - self.bid
    }

    /// True when this pair's `side` price is strictly worse than `other`'s.
    pub fn fades(&self, side: Side, other: &Px2) -> bool {
        side.fades(self.px(side), other.px(side))
    }
}

impl fmt::Display for Px2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.bid, self.ask)
    }
}

/// A bid/ask pair with displayed sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PxSize2 {
    px2: Px2,
    bid_size: Size,
    ask_size: Size,
}

impl PxSize2 {
    pub fn new(px2: Px2, bid_size: Size, ask_size: Size) -> Self {
        Self {
            px2,
            bid_size,
            ask_size,
        }
    }

    /// Same displayed size on both sides.
    pub fn with_size(size: Size, px2: Px2) -> Self {
        Self::new(px2, size, size)
    }

    pub fn px2(&self) -> Px2 {
        self.px2
    }

    pub fn size(&self, side: Side) -> Size {
        match side {
            Side::Bid => self.bid_size,
            Side::Ask => self.ask_size,
        }
    }
}

impl fmt::Display for PxSize2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}-{}x{}",
            self.bid_size, self.px2.bid, self.px2.ask, self.ask_size
        )
    }
}
