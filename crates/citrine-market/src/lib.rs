//! # citrine-market: option market models over the event substrate
//!
//! A model market for sets of listed options: Black-Scholes valuation of
//! each option against a simulated underlying, quote generation with
//! spread/hysteresis/display rules, and publication of the resulting quote
//! stream through [`citrine_reactor::SecondarySource`]s so a reactor
//! delivers everything in global timestamp order.
//!
//! Data flow (one underlying, one expiry):
//!
//! ```text
//!   RealizationSource<f64>          (underlying prices, fixed Δt)
//!        │ TimedSample<f64>
//!        ▼
//!   StrikeSetMarketModel            (greeks + quote hysteresis per option)
//!        │ publish
//!        ├──────────────► SecondarySource<BboTick>     (market data)
//!        └──────────────► SecondarySource<GreeksEvent> (model greeks)
//! ```

mod book;
mod config;
mod error;
mod events;
mod model;
mod option;
mod price;
pub mod pricing;
mod side;

pub use book::{Omd, OmdPair, StrikeSetOmd};
pub use config::MarketModelConfig;
pub use error::MarketError;
pub use events::{BboTick, GreeksEvent};
pub use model::{OptionMarketModel, StrikeSetMarketModel};
pub use option::{Callput, OptionId, OptionStrikeSet, StrikePair, VanillaOption};
pub use price::{Price, Px2, PxSize2, Pxtick, Size};
pub use pricing::{Greeks, PricingContext};
pub use side::Side;

#[cfg(test)]
mod tests;
