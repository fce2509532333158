//! Typed sinks and the type-erased attachment handle.
//!
//! A source fans out to heterogeneous subscribers through [`AnySink`]
//! handles. Each handle carries an explicit payload-type descriptor that the
//! source matches at attach time ([`AnySink::require_native`]); a mismatch
//! fails loudly with both descriptors, and delivery itself is always
//! statically typed.

use std::{
    any::{Any, TypeId, type_name},
    cell::RefCell,
    fmt,
    rc::Rc,
};

use crate::error::{ReactorError, SinkError};

/// Consumer of events of payload type `E`.
///
/// `on_attach`/`on_detach` fire when the sink joins or leaves a source's
/// callback set (including when the membership change was deferred to the
/// end of a fan-out).
pub trait EventSink<E> {
    fn on_event(&mut self, ev: &E) -> Result<(), SinkError>;

    fn on_attach(&mut self) {}

    fn on_detach(&mut self) {}
}

/// Blanket adapter: a closure is a sink.
impl<E, F> EventSink<E> for F
where
    F: FnMut(&E) -> Result<(), SinkError>,
{
    fn on_event(&mut self, ev: &E) -> Result<(), SinkError> {
        self(ev)
    }
}

/// Shared handle to a typed sink.
///
/// Sinks are logically reference-counted: a source holds a handle for the
/// duration of the attachment and releases it on detachment. Handle identity
/// (`Rc::ptr_eq`) is what `remove`/`detach` match on.
pub type SinkHandle<E> = Rc<TypedSink<E>>;

/// Concrete, payload-typed wrapper around a boxed [`EventSink`].
///
/// The concrete type (per `E`) is what [`AnySink::require_native`] downcasts
/// to; generic sinks therefore specialize at construction, and attachment
/// checks a single descriptor equality.
pub struct TypedSink<E> {
    inner: RefCell<Box<dyn EventSink<E>>>,
}

impl<E: 'static> TypedSink<E> {
    pub fn new(sink: impl EventSink<E> + 'static) -> SinkHandle<E> {
        Rc::new(Self {
            inner: RefCell::new(Box::new(sink)),
        })
    }

    /// Sink from an infallible closure.
    pub fn from_fn(mut f: impl FnMut(&E) + 'static) -> SinkHandle<E> {
        Self::new(move |ev: &E| {
            f(ev);
            Ok(())
        })
    }

    pub(crate) fn dispatch(&self, ev: &E) -> Result<(), SinkError> {
        self.inner.borrow_mut().on_event(ev)
    }

    pub(crate) fn notify_attach(&self) {
        self.inner.borrow_mut().on_attach();
    }

    pub(crate) fn notify_detach(&self) {
        self.inner.borrow_mut().on_detach();
    }
}

impl<E> fmt::Debug for TypedSink<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedSink")
            .field("payload", &type_name::<E>())
            .finish()
    }
}

// ============================================================================
// Payload descriptors & type-erased handles
// ============================================================================

/// Runtime descriptor of an event payload type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadType {
    id: TypeId,
    name: &'static str,
}

impl PayloadType {
    pub fn of<E: 'static>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: type_name::<E>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Type-erased sink handle, as passed to `ReactorSource::attach_sink`.
///
/// Carries the payload descriptor alongside the erased handle so a source
/// can check compatibility once, at attachment.
#[derive(Clone)]
pub struct AnySink {
    payload: PayloadType,
    inner: Rc<dyn Any>,
}

impl AnySink {
    /// Erases a typed handle.
    pub fn new<E: 'static>(handle: SinkHandle<E>) -> Self {
        Self {
            payload: PayloadType::of::<E>(),
            inner: handle,
        }
    }

    /// Descriptor of the payload this sink consumes.
    pub fn payload(&self) -> PayloadType {
        self.payload
    }

    /// Recovers the typed handle, or fails with a [`ReactorError::TypeMismatch`]
    /// naming both the payload offered (`E`) and the payload this sink
    /// consumes.
    pub fn require_native<E: 'static>(&self) -> Result<SinkHandle<E>, ReactorError> {
        self.inner
            .clone()
            .downcast::<TypedSink<E>>()
            .map_err(|_| ReactorError::TypeMismatch {
                expected: self.payload.name(),
                offered: type_name::<E>(),
            })
    }

    /// Handle identity (same underlying sink object).
    pub fn ptr_eq(&self, other: &AnySink) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for AnySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnySink")
            .field("payload", &self.payload.name())
            .finish()
    }
}

// ============================================================================
// Collecting sink (test & diagnostic aid)
// ============================================================================

/// A sink that records every event it receives.
///
/// The collector and its [`SinkHandle`] share storage, so events remain
/// readable after the handle has been attached and the simulation run.
pub struct CollectSink<E> {
    events: Rc<RefCell<Vec<E>>>,
}

impl<E: Clone + 'static> CollectSink<E> {
    pub fn new() -> Self {
        Self {
            events: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// A fresh attachable handle backed by this collector's storage.
    pub fn handle(&self) -> SinkHandle<E> {
        let events = Rc::clone(&self.events);
        TypedSink::from_fn(move |ev: &E| events.borrow_mut().push(ev.clone()))
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of everything collected so far.
    pub fn snapshot(&self) -> Vec<E> {
        self.events.borrow().clone()
    }
}

impl<E: Clone + 'static> Default for CollectSink<E> {
    fn default() -> Self {
        Self::new()
    }
}
