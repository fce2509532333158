//! Event trait and the standard timestamped-sample event.

use citrine_types::Timestamp;

/// An event deliverable through the reactor.
///
/// Events are opaque values passed to sinks by reference and copied by value
/// into source heaps; sinks must not mutate or retain them beyond the
/// dispatch. Ordering across events is by [`SimEvent::tm`], with ties broken
/// by the owning container using a stable insertion sequence — payloads do
/// not need to be `Ord` themselves.
pub trait SimEvent: Clone + 'static {
    /// Virtual time at which this event occurs.
    fn tm(&self) -> Timestamp;
}

/// A `(timestamp, value)` sample, the event shape produced by realization
/// sources tracing a stochastic process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedSample<T> {
    pub tm: Timestamp,
    pub value: T,
}

impl<T> TimedSample<T> {
    pub fn new(tm: Timestamp, value: T) -> Self {
        Self { tm, value }
    }
}

impl<T: Clone + 'static> SimEvent for TimedSample<T> {
    fn tm(&self) -> Timestamp {
        self.tm
    }
}
