//! # citrine-process: stochastic processes as event sources
//!
//! Continuous-time stochastic processes, sampled lazily along a single
//! realization (path), and packaged as reactor sources that emit
//! `(timestamp, value)` events at a fixed interval.
//!
//! Layering:
//!
//! - [`StochasticProcess`]: samples a process at arbitrary times, either
//!   beyond the known path ([`StochasticProcess::exterior_sample`]) or
//!   between two known points ([`StochasticProcess::interior_sample`],
//!   bridge sampling)
//! - [`Tracer`]: one-way iteration over a realization with a monotone
//!   current time
//! - [`RealizationSource`]: adapts a tracer to the reactor's source
//!   interface with a fixed sampling interval `Δt`
//!
//! Randomness comes from seeded [`rand::rngs::SmallRng`] generators: the
//! same seed always reproduces the same path.

mod error;
mod process;
mod realization;
mod tracer;

pub use error::ProcessError;
pub use process::{BrownianMotion, ConstantProcess, ExpProcess, StochasticProcess};
pub use realization::RealizationSource;
pub use tracer::{ProcessTracer, Tracer};

#[cfg(test)]
mod tests;
