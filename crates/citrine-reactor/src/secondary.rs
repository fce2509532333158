//! A source fed by `publish` calls from elsewhere in the event graph.

use std::{
    cell::{Cell, RefCell},
    cmp::Reverse,
    collections::BinaryHeap,
    rc::Rc,
};

use citrine_types::{SourceId, Timestamp};

use crate::callback::CallbackSet;
use crate::error::ReactorError;
use crate::event::SimEvent;
use crate::reactor::PrimeNotifier;
use crate::sink::{AnySink, SinkHandle};
use crate::source::ReactorSource;

/// Heap wrapper ordering events by `(tm, publish sequence)`.
///
/// The sequence number is the stable tie-break required by the event
/// ordering contract: among equal timestamps, delivery follows publish
/// order.
struct QueuedEvent<E> {
    tm: Timestamp,
    seq: u64,
    ev: E,
}

impl<E> PartialEq for QueuedEvent<E> {
    fn eq(&self, other: &Self) -> bool {
        self.tm == other.tm && self.seq == other.seq
    }
}

impl<E> Eq for QueuedEvent<E> {}

impl<E> PartialOrd for QueuedEvent<E> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for QueuedEvent<E> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.tm, self.seq).cmp(&(other.tm, other.seq))
    }
}

/// A source that collects externally-produced timestamped events into an
/// internal min-heap and forwards them, in timestamp order, when the
/// reactor schedules it.
///
/// Used by derived streams: e.g. a market model consumes underlying price
/// events and `publish`es computed quote events here, to be delivered at
/// their own (possibly delayed) timestamps.
///
/// # Priming
///
/// While empty, the source is *not-primed* and absent from the reactor
/// heap. The first `publish` after empty fires the priming notifier; a
/// publish that becomes the new head (earlier than everything queued)
/// re-keys the reactor's entry so cross-source ordering is preserved.
pub struct SecondarySource<E: SimEvent> {
    id: SourceId,
    name: String,
    heap: RefCell<BinaryHeap<Reverse<QueuedEvent<E>>>>,
    next_seq: Cell<u64>,
    /// Latest timestamp observed across all publishes; reported as
    /// `current_time` while the heap is empty.
    high_water: Cell<Timestamp>,
    upstream_exhausted: Cell<bool>,
    sinks: CallbackSet<E>,
    notifier: RefCell<Option<PrimeNotifier>>,
}

impl<E: SimEvent> SecondarySource<E> {
    pub fn new(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            id: SourceId::next(),
            name: name.into(),
            heap: RefCell::new(BinaryHeap::new()),
            next_seq: Cell::new(0),
            high_water: Cell::new(Timestamp::EPOCH),
            upstream_exhausted: Cell::new(false),
            sinks: CallbackSet::new(),
            notifier: RefCell::new(None),
        })
    }

    /// Queues an event for delivery at its own timestamp. Timestamps may
    /// arrive out of order; the internal heap restores order.
    ///
    /// Fails with [`ReactorError::UpstreamExhausted`] after
    /// [`Self::mark_upstream_exhausted`].
    pub fn publish(&self, ev: E) -> Result<(), ReactorError> {
        if self.upstream_exhausted.get() {
            return Err(ReactorError::UpstreamExhausted { source_id: self.id });
        }

        let tm = ev.tm();
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);

        let (was_empty, was_head) = {
            let mut heap = self.heap.borrow_mut();
            let was_empty = heap.is_empty();
            let was_head = heap.peek().map(|Reverse(q)| q.tm);
            heap.push(Reverse(QueuedEvent { tm, seq, ev }));
            (was_empty, was_head)
        };

        if tm > self.high_water.get() {
            self.high_water.set(tm);
        }

        let priming = was_empty;
        let new_head = was_head.is_some_and(|head| tm < head);

        tracing::trace!(
            source = %self.name,
            tm = %tm,
            priming,
            pending = self.pending(),
            "publish"
        );

        if priming || new_head {
            if let Some(notifier) = self.notifier.borrow().as_ref() {
                notifier.notify();
            }
        }

        Ok(())
    }

    /// Publishes a batch in iteration order.
    pub fn publish_all(&self, events: impl IntoIterator<Item = E>) -> Result<(), ReactorError> {
        for ev in events {
            self.publish(ev)?;
        }
        Ok(())
    }

    /// Declares that no further `publish` will ever arrive. Irreversible;
    /// once the queue drains, the source is exhausted.
    pub fn mark_upstream_exhausted(&self) {
        self.upstream_exhausted.set(true);
    }

    /// Number of queued, undelivered events.
    pub fn pending(&self) -> usize {
        self.heap.borrow().len()
    }

    /// Directly attaches a typed subscriber (the statically-typed
    /// equivalent of [`ReactorSource::attach_sink`]).
    pub fn subscribe(&self, sink: SinkHandle<E>) {
        self.sinks.add(sink);
    }

    pub fn unsubscribe(&self, sink: &SinkHandle<E>) {
        self.sinks.remove(sink);
    }

    /// Pops the earliest queued event. Removal happens before any fan-out
    /// so callbacks may reentrantly publish into this same source.
    fn pop_next(&self) -> Option<E> {
        self.heap.borrow_mut().pop().map(|Reverse(q)| q.ev)
    }

    fn head_tm(&self) -> Option<Timestamp> {
        self.heap.borrow().peek().map(|Reverse(q)| q.tm)
    }
}

impl<E: SimEvent> ReactorSource for SecondarySource<E> {
    fn source_id(&self) -> SourceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_empty(&self) -> bool {
        self.heap.borrow().is_empty()
    }

    fn is_exhausted(&self) -> bool {
        self.upstream_exhausted.get() && self.is_empty()
    }

    fn current_time(&self) -> Timestamp {
        self.head_tm().unwrap_or_else(|| self.high_water.get())
    }

    fn deliver_one(&self) -> Result<u64, ReactorError> {
        let Some(ev) = self.pop_next() else {
            return Ok(0);
        };

        self.sinks.invoke(&ev)?;
        Ok(1)
    }

    fn advance_until(&self, t: Timestamp, replay: bool) -> Result<u64, ReactorError> {
        let mut consumed = 0;

        while self.head_tm().is_some_and(|tm| tm < t) {
            let ev = self.pop_next().expect("head exists");
            if replay {
                self.sinks.invoke(&ev)?;
            }
            consumed += 1;
        }

        Ok(consumed)
    }

    fn attach_sink(&self, sink: AnySink) -> Result<(), ReactorError> {
        let handle = sink.require_native::<E>()?;
        self.sinks.add(handle);
        Ok(())
    }

    fn detach_sink(&self, sink: &AnySink) -> Result<(), ReactorError> {
        let handle = sink.require_native::<E>()?;
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

impl<E: SimEvent> std::fmt::Debug for SecondarySource<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecondarySource")
            .field("name", &self.name)
            .field("pending", &self.pending())
            .field("upstream_exhausted", &self.upstream_exhausted.get())
            .finish()
    }
}
