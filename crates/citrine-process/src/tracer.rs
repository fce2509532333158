//! One-way iteration over a single realization of a process.

use citrine_types::{SimDuration, Timestamp};

use crate::process::StochasticProcess;

/// A tracer walks one realization (sampled path) of a stochastic process:
/// it has a monotone current time and extends the path on demand.
///
/// The realization source depends only on this shape; it neither constructs
/// processes nor owns random state.
pub trait Tracer<T> {
    /// Current position on the path.
    fn current_time(&self) -> Timestamp;

    /// Path value at [`Self::current_time`].
    fn current_value(&self) -> T;

    /// Extends the path to `current_time + dt`.
    fn advance(&mut self, dt: SimDuration);

    /// Extends the path to `t`; no-op if `t` is not ahead of the current
    /// position.
    fn advance_until(&mut self, t: Timestamp) {
        let now = self.current_time();
        if t > now {
            self.advance(t - now);
        }
    }
}

/// Lazy realization of a [`StochasticProcess`]: each advance draws the next
/// point via exterior sampling from the last known point.
pub struct ProcessTracer<P> {
    process: P,
    tm: Timestamp,
    value: f64,
}

impl<P: StochasticProcess> ProcessTracer<P> {
    /// Starts the path at the process's own origin `(t0, t0_value)`.
    pub fn new(process: P) -> Self {
        let tm = process.t0();
        let value = process.t0_value();
        Self { process, tm, value }
    }

    pub fn process(&self) -> &P {
        &self.process
    }
}

impl<P: StochasticProcess> Tracer<f64> for ProcessTracer<P> {
    fn current_time(&self) -> Timestamp {
        self.tm
    }

    fn current_value(&self) -> f64 {
        self.value
    }

    fn advance(&mut self, dt: SimDuration) {
        if !dt.is_positive() {
            return;
        }

        let t_next = self.tm + dt;
        self.value = self.process.exterior_sample(t_next, (self.tm, self.value));
        self.tm = t_next;
    }
}

impl<P: StochasticProcess> std::fmt::Debug for ProcessTracer<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessTracer")
            .field("tm", &self.tm)
            .field("value", &self.value)
            .finish()
    }
}
