//! # citrine-reactor: virtual-time event scheduling
//!
//! The reactor is the single-threaded heart of the `Citrine` substrate. It
//! multiplexes heterogeneous event sources under one logical clock, delivers
//! events in global timestamp order, and fans each event out to typed
//! subscribers.
//!
//! ## Key pieces
//!
//! - [`CallbackSet`]: subscriber fan-out that is safe against add/remove
//!   *during* fan-out (a deferred-operation log applied when iteration ends,
//!   on success or failure)
//! - [`EventSink`] / [`TypedSink`] / [`AnySink`]: late-bound wiring between
//!   publishers and consumers with a runtime payload-type check at attach
//!   time — never at delivery time
//! - [`ReactorSource`]: the readiness/time interface the scheduler drives
//!   (`primed` / `not-primed` / `exhausted`)
//! - [`Reactor`]: the min-heap scheduler with a priming protocol for sources
//!   whose next event is not yet known
//! - [`SecondarySource`]: a source fed by `publish` calls from elsewhere in
//!   the event graph
//!
//! ## Concurrency model
//!
//! Strictly single-threaded and cooperative: the only yield point is the
//! return from [`Reactor::run_one`]. No type in this crate is `Send` or
//! `Sync`. Reentrant *publication* during a delivery is fully supported
//! (that is the priming protocol); reentrant *scheduling* — a recursive
//! `run_one` from inside a delivery — is unsupported and yields unspecified
//! event ordering.

mod callback;
mod error;
mod event;
mod reactor;
mod secondary;
mod sink;
mod source;

pub use callback::CallbackSet;
pub use error::{ReactorError, SinkError};
pub use event::{SimEvent, TimedSample};
pub use reactor::{PrimeNotifier, Reactor};
pub use secondary::SecondarySource;
pub use sink::{AnySink, CollectSink, EventSink, PayloadType, SinkHandle, TypedSink};
pub use source::ReactorSource;
