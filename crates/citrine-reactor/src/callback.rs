//! Reentrant-safe subscriber fan-out.
//!
//! Callbacks running inside [`CallbackSet::invoke`] may freely add or remove
//! subscribers on the same set (including removing themselves). Such
//! mutations are queued in a deferred-operation log and applied, in
//! submission order, when the fan-out finishes — whether it finishes
//! normally or by an error return.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use crate::error::SinkError;
use crate::sink::SinkHandle;

enum CbCmd<E> {
    Add(SinkHandle<E>),
    Remove(SinkHandle<E>),
}

/// Ordered set of subscribers with a deferred-mutation log.
///
/// Invariant: while an `invoke` is in progress, the active list is never
/// structurally modified; all membership changes land in the deferred log
/// and are applied atomically at iteration end.
///
/// Not thread-safe; single calling thread assumed (the type is `!Send`).
pub struct CallbackSet<E> {
    active: RefCell<Vec<SinkHandle<E>>>,
    deferred: RefCell<Vec<CbCmd<E>>>,
    running: Cell<bool>,
}

impl<E: 'static> CallbackSet<E> {
    pub fn new() -> Self {
        Self {
            active: RefCell::new(Vec::new()),
            deferred: RefCell::new(Vec::new()),
            running: Cell::new(false),
        }
    }

    /// Number of active subscribers (deferred operations not yet counted).
    pub fn len(&self) -> usize {
        self.active.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds a subscriber and notifies it of its attachment. Reentrant:
    /// during a fan-out the addition is deferred, and the subscriber will
    /// not see the in-flight event.
    pub fn add(&self, sink: SinkHandle<E>) {
        if self.running.get() {
            self.deferred.borrow_mut().push(CbCmd::Add(sink));
        } else {
            self.active.borrow_mut().push(sink.clone());
            sink.notify_attach();
        }
    }

    /// Removes a subscriber (by handle identity) and notifies it of its
    /// detachment; no-op if absent. Reentrant: during a fan-out the removal
    /// is deferred, and a subscriber removing itself still receives the
    /// current event.
    pub fn remove(&self, sink: &SinkHandle<E>) {
        if self.running.get() {
            self.deferred.borrow_mut().push(CbCmd::Remove(Rc::clone(sink)));
        } else {
            self.remove_now(sink);
        }
    }

    fn remove_now(&self, sink: &SinkHandle<E>) {
        let removed = {
            let mut active = self.active.borrow_mut();
            active
                .iter()
                .position(|s| Rc::ptr_eq(s, sink))
                .map(|pos| active.remove(pos))
        };

        if let Some(s) = removed {
            s.notify_detach();
        }
    }

    /// Delivers `ev` to a snapshot of the current subscribers, in attachment
    /// order. Stops at the first sink failure; in both the success and the
    /// failure case the deferred log is applied before returning.
    pub fn invoke(&self, ev: &E) -> Result<(), SinkError> {
        debug_assert!(!self.running.get(), "reentrant invoke on the same callback set");

        let snapshot: Vec<SinkHandle<E>> = self.active.borrow().clone();
        self.running.set(true);

        let guard = FlushGuard { set: self };
        for sink in &snapshot {
            sink.dispatch(ev)?;
        }
        drop(guard);

        Ok(())
    }
}

impl<E: 'static> Default for CallbackSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the deferred log on scope exit — normal or early (`?`) alike.
struct FlushGuard<'a, E: 'static> {
    set: &'a CallbackSet<E>,
}

impl<E: 'static> Drop for FlushGuard<'_, E> {
    fn drop(&mut self) {
        self.set.running.set(false);

        let cmds: Vec<CbCmd<E>> = self.set.deferred.borrow_mut().drain(..).collect();
        for cmd in cmds {
            match cmd {
                CbCmd::Add(sink) => {
                    self.set.active.borrow_mut().push(sink.clone());
                    sink.notify_attach();
                }
                CbCmd::Remove(sink) => self.set.remove_now(&sink),
            }
        }
    }
}
