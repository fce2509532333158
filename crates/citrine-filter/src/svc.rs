//! The filter as an active event consumer and producer.

use std::{cell::RefCell, rc::Rc};

use citrine_reactor::{CallbackSet, SinkError, SinkHandle, TypedSink};

use crate::model::KalmanInput;
use crate::spec::{KalmanFilter, KalmanFilterSpec};
use crate::state::KalmanStateExt;

/// Wraps a passive [`KalmanFilter`] as an event-graph node: feed it
/// [`KalmanInput`] events through [`KalmanFilterSvc::input_sink`], and it
/// publishes each resulting [`KalmanStateExt`] to its output callbacks
/// synchronously, within the same delivery.
pub struct KalmanFilterSvc {
    filter: RefCell<KalmanFilter>,
    outputs: CallbackSet<KalmanStateExt>,
}

impl KalmanFilterSvc {
    pub fn new(spec: KalmanFilterSpec) -> Rc<Self> {
        Rc::new(Self {
            filter: RefCell::new(KalmanFilter::new(spec)),
            outputs: CallbackSet::new(),
        })
    }

    /// Current filter state (the starting state until the first input).
    pub fn state(&self) -> KalmanStateExt {
        self.filter.borrow().state().clone()
    }

    /// Subscribes to filter output states.
    pub fn add_filter_callback(&self, sink: SinkHandle<KalmanStateExt>) {
        self.outputs.add(sink);
    }

    pub fn remove_filter_callback(&self, sink: &SinkHandle<KalmanStateExt>) {
        self.outputs.remove(sink);
    }

    /// A sink to attach to an observation source. Each event runs one
    /// filter step; filter errors surface as sink failures and propagate
    /// through the reactor's delivery path.
    pub fn input_sink(self: &Rc<Self>) -> SinkHandle<KalmanInput> {
        let svc = Rc::clone(self);
        TypedSink::new(move |input: &KalmanInput| -> Result<(), SinkError> {
            svc.on_input(input)
        })
    }

    fn on_input(&self, input: &KalmanInput) -> Result<(), SinkError> {
        let next = {
            let mut filter = self.filter.borrow_mut();
            filter
                .notify_input(input)
                .map_err(|e| SinkError::new(e.to_string()))?
                .clone()
        };

        tracing::trace!(step = next.step_no(), tm = %next.tm(), "filter step");

        self.outputs.invoke(&next)?;
        Ok(())
    }
}

impl std::fmt::Debug for KalmanFilterSvc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KalmanFilterSvc")
            .field("state", &self.filter.borrow().state())
            .finish()
    }
}
