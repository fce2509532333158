//! Quote-generation parameters.

use citrine_types::SimDuration;
use serde::{Deserialize, Serialize};

/// Tunable parameters of the per-option quote engine.
///
/// Deserializable so a simulation setup can ship these in its config file;
/// defaults match the standard model market.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketModelConfig {
    /// Half-spread applied around theory value, per share.
    pub half_spread: f64,

    /// A quote counts as competitive while within
    /// `compete_factor · half_spread` of theory value.
    pub compete_factor: f64,

    /// Quote improvements are suppressed for options with
    /// `|delta| ≥ delta_update_cutoff` (high-delta options rarely trade, so
    /// the model market minimizes updates for them).
    pub delta_update_cutoff: f64,

    /// Widest displayed spread; beyond this, quotes refresh to the model
    /// inside market.
    pub max_spread: f64,

    /// Lag between an underlying print and the option quote derived from
    /// it.
    pub quote_delay: SimDuration,

    /// Displayed size per side, in contracts.
    pub quote_size: u32,
}

impl Default for MarketModelConfig {
    fn default() -> Self {
        Self {
            half_spread: 0.02,
            compete_factor: 1.5,
            delta_update_cutoff: 0.75,
            max_spread: 2.0,
            quote_delay: SimDuration::from_micros(500),
            quote_size: 1,
        }
    }
}
