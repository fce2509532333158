//! A reactor source that samples a tracer at a fixed interval.

use std::{cell::RefCell, rc::Rc};

use citrine_reactor::{
    AnySink, CallbackSet, PrimeNotifier, ReactorError, ReactorSource, SinkHandle, TimedSample,
};
use citrine_types::{SimDuration, SourceId, Timestamp};

use crate::error::ProcessError;
use crate::tracer::Tracer;

/// Publishes a realization of a stochastic process as `(t, value)` events,
/// one every `Δt` of virtual time.
///
/// The realization is developed lazily by the wrapped [`Tracer`]. The
/// source is always primed and never exhausts on its own: the reactor's
/// `run_until` bound imposes the terminal time.
pub struct RealizationSource<T: Clone + 'static> {
    id: SourceId,
    name: String,
    tracer: RefCell<Box<dyn Tracer<T>>>,
    interval: SimDuration,
    sinks: CallbackSet<TimedSample<T>>,
    notifier: RefCell<Option<PrimeNotifier>>,
}

impl<T: Clone + 'static> RealizationSource<T> {
    /// Fails with [`ProcessError::NonPositiveInterval`] unless `Δt > 0`.
    pub fn new(
        name: impl Into<String>,
        tracer: impl Tracer<T> + 'static,
        interval: SimDuration,
    ) -> Result<Rc<Self>, ProcessError> {
        if !interval.is_positive() {
            return Err(ProcessError::NonPositiveInterval { interval });
        }

        Ok(Rc::new(Self {
            id: SourceId::next(),
            name: name.into(),
            tracer: RefCell::new(Box::new(tracer)),
            interval,
            sinks: CallbackSet::new(),
            notifier: RefCell::new(None),
        }))
    }

    pub fn interval(&self) -> SimDuration {
        self.interval
    }

    /// Directly attaches a typed subscriber.
    pub fn subscribe(&self, sink: SinkHandle<TimedSample<T>>) {
        self.sinks.add(sink);
    }

    pub fn unsubscribe(&self, sink: &SinkHandle<TimedSample<T>>) {
        self.sinks.remove(sink);
    }

    /// Current sample, fanned out on the next delivery.
    fn current_sample(&self) -> TimedSample<T> {
        let tracer = self.tracer.borrow();
        TimedSample::new(tracer.current_time(), tracer.current_value())
    }
}

impl<T: Clone + 'static> ReactorSource for RealizationSource<T> {
    fn source_id(&self) -> SourceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    /// A realization always knows its next sample.
    fn is_empty(&self) -> bool {
        false
    }

    /// No terminal time of its own; the reactor bounds the run.
    fn is_exhausted(&self) -> bool {
        false
    }

    fn current_time(&self) -> Timestamp {
        self.tracer.borrow().current_time()
    }

    fn deliver_one(&self) -> Result<u64, ReactorError> {
        let sample = self.current_sample();

        // fan out first: callbacks may reentrantly adjust subscriptions,
        // but the tracer advances regardless of their outcome order
        self.sinks.invoke(&sample)?;
        self.tracer.borrow_mut().advance(self.interval);

        Ok(1)
    }

    fn advance_until(&self, t: Timestamp, replay: bool) -> Result<u64, ReactorError> {
        if replay {
            let mut delivered = 0;
            while self.current_time() < t {
                delivered += self.deliver_one()?;
            }
            Ok(delivered)
        } else {
            self.tracer.borrow_mut().advance_until(t);
            Ok(0)
        }
    }

    fn attach_sink(&self, sink: AnySink) -> Result<(), ReactorError> {
        let handle = sink.require_native::<TimedSample<T>>()?;
        self.sinks.add(handle);
        Ok(())
    }

    fn detach_sink(&self, sink: &AnySink) -> Result<(), ReactorError> {
        let handle = sink.require_native::<TimedSample<T>>()?;
        self.sinks.remove(&handle);
        Ok(())
    }

    fn bind_reactor(&self, notifier: PrimeNotifier) -> Result<(), ReactorError> {
        let mut slot = self.notifier.borrow_mut();
        if slot.is_some() {
            return Err(ReactorError::AlreadyAttached { source_id: self.id });
        }
        *slot = Some(notifier);
        Ok(())
    }

    fn unbind_reactor(&self) {
        *self.notifier.borrow_mut() = None;
    }
}

impl<T: Clone + 'static> std::fmt::Debug for RealizationSource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealizationSource")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("current_time", &self.current_time())
            .finish()
    }
}
