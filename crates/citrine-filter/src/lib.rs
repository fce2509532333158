//! # citrine-filter: discrete linear Kalman filtering
//!
//! A pure engine for the discrete linear Gaussian filter, plus the wiring
//! to drive it from reactor event streams.
//!
//! The filter estimates an `n`-dimensional hidden state observed through an
//! `m`-dimensional observation vector:
//!
//! ```text
//!   x_(k+1) = F(k)·x_(k) + w(k)      w ~ N(0, Q)     (transition)
//!   z(k)    = H(k)·x_(k) + v(k)      v ~ N(0, R)     (observation)
//! ```
//!
//! [`engine`] provides the stateless building blocks (`extrapolate`,
//! `kalman_gain`, `correct`, and their scalar-observable `*1` variants);
//! [`KalmanFilterSpec`] packages a starting state with a *step spec* — a
//! callable producing the step matrices from the previous state and the
//! incoming observation, so `F`, `Q`, `H`, `R` may depend on the elapsed
//! `Δt` and the observation cardinality (event-driven timing);
//! [`KalmanFilterSvc`] runs one filter step per incoming
//! [`KalmanInput`] event and publishes the resulting extended states.
//!
//! The engine returns fresh states and never mutates its inputs.

pub mod engine;

mod error;
mod model;
mod spec;
mod state;
mod svc;

pub use error::FilterError;
pub use model::{KalmanInput, KalmanObservable, KalmanTransition};
pub use spec::{KalmanFilter, KalmanFilterSpec, KalmanStep, MkStepFn};
pub use state::{KalmanState, KalmanStateExt, ObservedMarker};
pub use svc::KalmanFilterSvc;

#[cfg(test)]
mod tests;
