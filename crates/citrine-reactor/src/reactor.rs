//! The virtual-time scheduler.

use std::{
    cell::{Cell, RefCell},
    cmp::Reverse,
    collections::{BTreeMap, BinaryHeap},
    rc::{Rc, Weak},
};

use citrine_types::{SourceId, Timestamp};

use crate::error::ReactorError;
use crate::source::ReactorSource;

/// Heap key: earliest head-timestamp first, then stable source identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct HeapEntry {
    tm: Timestamp,
    id: SourceId,
}

/// Scheduler state shared between the public handle and the priming
/// back-edges held (weakly) by sources.
struct ReactorCore {
    /// Virtual clock: timestamp of the last delivered event (construction
    /// epoch before any delivery). Never regresses.
    t_now: Cell<Timestamp>,

    /// Min-heap of `(head timestamp, source)` entries. Entries are
    /// lazily superseded: `queued` holds the authoritative key per source,
    /// and popped entries that disagree with it are discarded.
    heap: RefCell<BinaryHeap<Reverse<HeapEntry>>>,

    /// Sources currently in the heap, with their authoritative key.
    /// Exactly the currently-primed attached sources.
    queued: RefCell<BTreeMap<SourceId, Timestamp>>,

    /// All attached sources.
    sources: RefCell<BTreeMap<SourceId, Rc<dyn ReactorSource>>>,
}

impl ReactorCore {
    /// (Re-)keys `id` in the heap at timestamp `tm`. Idempotent; an
    /// existing entry is superseded rather than duplicated.
    fn heap_insert(&self, id: SourceId, tm: Timestamp) {
        self.queued.borrow_mut().insert(id, tm);
        self.heap.borrow_mut().push(Reverse(HeapEntry { tm, id }));
    }

    fn heap_remove(&self, id: SourceId) {
        // entries left in the heap are discarded lazily on pop
        self.queued.borrow_mut().remove(&id);
    }

    /// Root timestamp, discarding superseded entries.
    fn peek_root_tm(&self) -> Option<Timestamp> {
        let mut heap = self.heap.borrow_mut();
        let queued = self.queued.borrow();

        while let Some(&Reverse(entry)) = heap.peek() {
            if queued.get(&entry.id) == Some(&entry.tm) {
                return Some(entry.tm);
            }
            heap.pop();
        }
        None
    }

    /// Priming / re-key notification from a source (possibly mid-delivery
    /// of another source on this same thread).
    fn notify_source_primed(&self, id: SourceId) {
        let src = self.sources.borrow().get(&id).cloned();
        let Some(src) = src else {
            tracing::trace!(source = %id, "priming notification from unattached source ignored");
            return;
        };

        if !src.is_primed() {
            return;
        }

        let head = src.current_time();
        tracing::trace!(source = %src.name(), tm = %head, "source primed");
        self.heap_insert(id, head);
    }

    /// Restores the heap invariant for `src` after a delivery attempt.
    fn reinsert_if_primed(&self, src: &dyn ReactorSource) {
        let id = src.source_id();

        if !self.sources.borrow().contains_key(&id) {
            // removed during its own delivery
            return;
        }
        if !src.is_primed() {
            self.heap_remove(id);
            return;
        }
        self.heap_insert(id, src.current_time());
    }
}

/// The scheduler: a modifiable set of sources multiplexed under a single
/// monotone virtual clock.
///
/// # Invariants
///
/// - every primed attached source is queued exactly once, keyed by its head
///   timestamp; no not-primed or exhausted source is queued
/// - the queue root's timestamp is never below the last delivered timestamp
/// - events are delivered in nondecreasing timestamp order across all
///   attached sources, ties broken by [`SourceId`]
///
/// `Reactor` is a cheap clonable handle; clones share the same scheduler.
#[derive(Clone)]
pub struct Reactor {
    core: Rc<ReactorCore>,
}

impl Reactor {
    /// Creates a reactor with its virtual clock at `t0`.
    pub fn new(t0: Timestamp) -> Self {
        Self {
            core: Rc::new(ReactorCore {
                t_now: Cell::new(t0),
                heap: RefCell::new(BinaryHeap::new()),
                queued: RefCell::new(BTreeMap::new()),
                sources: RefCell::new(BTreeMap::new()),
            }),
        }
    }

    /// Virtual clock: the timestamp of the last delivered event.
    pub fn current_time(&self) -> Timestamp {
        self.core.t_now.get()
    }

    /// Timestamp of the earliest pending event, or `current_time` when no
    /// source is primed.
    pub fn next_time(&self) -> Timestamp {
        self.core.peek_root_tm().unwrap_or_else(|| self.current_time())
    }

    /// True when no attached source is primed.
    pub fn is_exhausted(&self) -> bool {
        self.core.peek_root_tm().is_none()
    }

    /// Number of attached sources.
    pub fn source_count(&self) -> usize {
        self.core.sources.borrow().len()
    }

    /// Number of sources currently in the scheduling heap.
    pub fn queued_count(&self) -> usize {
        self.core.queued.borrow().len()
    }

    /// Adopts a source: binds the priming back-edge, fast-forwards the
    /// source past events staler than the current virtual time (without
    /// replaying them), and queues it if primed.
    ///
    /// Returns `Ok(false)` if the source was already attached to this
    /// reactor; fails with [`ReactorError::AlreadyAttached`] if it is bound
    /// to a different reactor.
    pub fn add_source(&self, src: Rc<dyn ReactorSource>) -> Result<bool, ReactorError> {
        let id = src.source_id();

        if self.core.sources.borrow().contains_key(&id) {
            return Ok(false);
        }

        src.bind_reactor(PrimeNotifier {
            core: Rc::downgrade(&self.core),
            source: id,
        })?;

        if let Err(e) = src.advance_until(self.current_time(), false) {
            src.unbind_reactor();
            return Err(e);
        }

        self.core.sources.borrow_mut().insert(id, Rc::clone(&src));

        if src.is_primed() {
            self.core.heap_insert(id, src.current_time());
        }

        tracing::debug!(source = %src.name(), id = %id, primed = src.is_primed(), "source added");
        Ok(true)
    }

    /// Removes a source from the attached set and the heap (if queued);
    /// returns `false` if it was not attached. In-flight delivery of other
    /// sources is unaffected.
    pub fn remove_source(&self, src: &Rc<dyn ReactorSource>) -> bool {
        let id = src.source_id();

        let removed = self.core.sources.borrow_mut().remove(&id);
        if removed.is_none() {
            return false;
        }

        self.core.heap_remove(id);
        src.unbind_reactor();

        tracing::debug!(source = %src.name(), id = %id, "source removed");
        true
    }

    /// Delivers the single earliest pending event across all sources.
    ///
    /// Returns the number of events delivered (0 on an empty heap — not an
    /// error). If the delivery itself fails, scheduling invariants are
    /// restored (the source is re-queued iff still primed) before the error
    /// propagates.
    pub fn run_one(&self) -> Result<u64, ReactorError> {
        loop {
            let popped = self.core.heap.borrow_mut().pop();
            let Some(Reverse(entry)) = popped else {
                return Ok(0);
            };

            // discard superseded entries
            if self.core.queued.borrow().get(&entry.id) != Some(&entry.tm) {
                continue;
            }
            self.core.queued.borrow_mut().remove(&entry.id);

            let src = self.core.sources.borrow().get(&entry.id).cloned();
            let Some(src) = src else {
                continue;
            };

            if !src.is_primed() {
                continue;
            }

            // the clock never regresses, even for events published "in the past"
            let head = src.current_time();
            let t_now = self.core.t_now.get().max(head);
            self.core.t_now.set(t_now);

            tracing::trace!(source = %src.name(), tm = %head, "run_one delivering");

            let result = src.deliver_one();

            // restore invariants before surfacing any delivery failure
            self.core.reinsert_if_primed(&*src);

            return result;
        }
    }

    /// Runs while the earliest pending event is at or before `t1`.
    /// Returns the total number of events delivered.
    pub fn run_until(&self, t1: Timestamp) -> Result<u64, ReactorError> {
        let mut delivered = 0;

        while let Some(root_tm) = self.core.peek_root_tm() {
            if root_tm > t1 {
                break;
            }
            delivered += self.run_one()?;
        }

        Ok(delivered)
    }
}

impl std::fmt::Debug for Reactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reactor")
            .field("t_now", &self.current_time())
            .field("sources", &self.source_count())
            .field("queued", &self.queued_count())
            .finish()
    }
}

/// Non-owning back-edge from a source to its reactor.
///
/// A not-primed source fires [`PrimeNotifier::notify`] when it first obtains
/// an event (or when a newly published event becomes its new head); the
/// reactor re-keys the source in its heap. The notifier holds the reactor
/// weakly — a source never keeps its reactor alive — so notifications after
/// the reactor is gone are silently dropped.
#[derive(Clone)]
pub struct PrimeNotifier {
    core: Weak<ReactorCore>,
    source: SourceId,
}

impl PrimeNotifier {
    pub fn notify(&self) {
        if let Some(core) = self.core.upgrade() {
            core.notify_source_primed(self.source);
        }
    }

    pub fn source_id(&self) -> SourceId {
        self.source
    }
}

impl std::fmt::Debug for PrimeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimeNotifier")
            .field("source", &self.source)
            .finish()
    }
}
