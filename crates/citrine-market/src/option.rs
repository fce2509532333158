//! Option terms: single options, call/put pairs, strike grids.

use citrine_types::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::MarketError;
use crate::price::Pxtick;

/// Call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Callput {
    Call,
    Put,
}

/// Unique id for one listed option.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct OptionId(u32);

impl OptionId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for OptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "opt-{}", self.0)
    }
}

/// Minimal terms for one vanilla option — enough to drive model pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VanillaOption {
    id: OptionId,
    callput: Callput,
    /// Strike, in per-share dollars.
    strike: f64,
    expiry: Timestamp,
    pxtick: Pxtick,
}

impl VanillaOption {
    pub fn new(
        id: OptionId,
        callput: Callput,
        strike: f64,
        expiry: Timestamp,
        pxtick: Pxtick,
    ) -> Self {
        Self {
            id,
            callput,
            strike,
            expiry,
            pxtick,
        }
    }

    pub fn id(&self) -> OptionId {
        self.id
    }

    pub fn callput(&self) -> Callput {
        self.callput
    }

    pub fn strike(&self) -> f64 {
        self.strike
    }

    pub fn expiry(&self) -> Timestamp {
        self.expiry
    }

    pub fn pxtick(&self) -> Pxtick {
        self.pxtick
    }
}

/// A call/put pair sharing `{strike, expiry, tick regime}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrikePair {
    call: VanillaOption,
    put: VanillaOption,
}

impl StrikePair {
    /// Builds a pair with ids `base_id` (call) and `base_id + 1` (put).
    pub fn make_callput_pair(
        base_id: u32,
        strike: f64,
        expiry: Timestamp,
        pxtick: Pxtick,
    ) -> Self {
        Self {
            call: VanillaOption::new(OptionId::new(base_id), Callput::Call, strike, expiry, pxtick),
            put: VanillaOption::new(
                OptionId::new(base_id + 1),
                Callput::Put,
                strike,
                expiry,
                pxtick,
            ),
        }
    }

    pub fn call(&self) -> &VanillaOption {
        &self.call
    }

    pub fn put(&self) -> &VanillaOption {
        &self.put
    }

    pub fn strike(&self) -> f64 {
        self.call.strike
    }

    /// Verifies pair coherence: sides, shared strike and expiry.
    pub fn verify_ok(&self) -> Result<(), MarketError> {
        let coherent = self.call.callput() == Callput::Call
            && self.put.callput() == Callput::Put
            && self.call.strike() == self.put.strike()
            && self.call.expiry() == self.put.expiry();

        if coherent {
            Ok(())
        } else {
            Err(MarketError::BrokenStrikePair {
                strike: self.call.strike(),
            })
        }
    }
}

/// Options sharing an underlying and expiry, organized in call/put pairs by
/// increasing strike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionStrikeSet {
    pairs: Vec<StrikePair>,
    expiry: Timestamp,
}

impl OptionStrikeSet {
    /// A full pair per strike: `n` strikes `lo_strike + i·d_strike`,
    /// `i ∈ [0, n)`. Ids run sequentially from 0.
    pub fn regular(
        n: u32,
        lo_strike: f64,
        d_strike: f64,
        expiry: Timestamp,
        pxtick: Pxtick,
    ) -> Result<Self, MarketError> {
        if n == 0 || lo_strike <= 0.0 || d_strike <= 0.0 {
            return Err(MarketError::InvalidStrikeGrid {
                n,
                lo_strike,
                d_strike,
            });
        }

        let pairs = (0..n)
            .map(|i| {
                StrikePair::make_callput_pair(
                    2 * i,
                    lo_strike + f64::from(i) * d_strike,
                    expiry,
                    pxtick,
                )
            })
            .collect();

        Ok(Self { pairs, expiry })
    }

    pub fn expiry(&self) -> Timestamp {
        self.expiry
    }

    /// Number of strikes (pairs); option count is twice this.
    pub fn n_strike(&self) -> usize {
        self.pairs.len()
    }

    pub fn pairs(&self) -> &[StrikePair] {
        &self.pairs
    }

    /// All options, calls and puts interleaved in strike order.
    pub fn options(&self) -> impl Iterator<Item = &VanillaOption> {
        self.pairs
            .iter()
            .flat_map(|pair| [pair.call(), pair.put()])
    }

    /// Verifies every pair plus strict strike ascent across pairs.
    pub fn verify_ok(&self) -> Result<(), MarketError> {
        for pair in &self.pairs {
            pair.verify_ok()?;
        }

        for window in self.pairs.windows(2) {
            if window[0].strike() >= window[1].strike() {
                return Err(MarketError::InvalidStrikeGrid {
                    n: self.pairs.len() as u32,
                    lo_strike: window[0].strike(),
                    d_strike: window[1].strike() - window[0].strike(),
                });
            }
        }

        Ok(())
    }
}
