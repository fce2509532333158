//! The interface the reactor drives.

use citrine_types::{SourceId, Timestamp};

use crate::error::ReactorError;
use crate::reactor::PrimeNotifier;
use crate::sink::AnySink;

/// A producer of timestamped events schedulable by a [`crate::Reactor`].
///
/// # Readiness states
///
/// - **primed**: the source can report the timestamp of its next event
///   (`!is_empty() && !is_exhausted()`); it belongs in the reactor heap.
/// - **not-primed**: the source has no known next event but may obtain one
///   later (`is_empty() && !is_exhausted()`); it must stay out of the heap
///   and fire its [`PrimeNotifier`] when an event first arrives.
/// - **exhausted**: no further events will ever be produced; irreversible.
///
/// All methods take `&self`: sources use interior mutability, because
/// delivery can reenter the event graph on the same thread (a sink fanning
/// out from one source may publish into another).
pub trait ReactorSource {
    /// Stable identity; the reactor's tie-break for equal timestamps.
    fn source_id(&self) -> SourceId;

    /// Human-readable name for diagnostics.
    fn name(&self) -> &str;

    /// True when the source has no event ready right now.
    fn is_empty(&self) -> bool;

    /// True when the source will never produce another event.
    fn is_exhausted(&self) -> bool;

    /// Knows its next event and may sit in the reactor heap.
    fn is_primed(&self) -> bool {
        !self.is_empty() && !self.is_exhausted()
    }

    /// Timestamp of the next event when primed; a monotone high-water mark
    /// otherwise.
    fn current_time(&self) -> Timestamp;

    /// Delivers exactly one event through this source's subscribers.
    /// Returns the number delivered (0 when empty).
    fn deliver_one(&self) -> Result<u64, ReactorError>;

    /// Consumes events with timestamps strictly before `t`: fanning them out
    /// when `replay` is true, silently dropping (or skipping over) them when
    /// false. Returns the number consumed.
    fn advance_until(&self, t: Timestamp, replay: bool) -> Result<u64, ReactorError>;

    /// Attaches a type-erased sink; fails with
    /// [`ReactorError::TypeMismatch`] if the sink consumes a different
    /// payload than this source delivers.
    fn attach_sink(&self, sink: AnySink) -> Result<(), ReactorError>;

    /// Detaches a previously attached sink (no-op if absent). The payload
    /// check still applies, so mis-typed detach attempts are diagnosable.
    fn detach_sink(&self, sink: &AnySink) -> Result<(), ReactorError>;

    /// Installs the priming back-edge when the source is adopted by a
    /// reactor. Fails with [`ReactorError::AlreadyAttached`] if the source
    /// is already bound; a source belongs to at most one reactor at a time.
    fn bind_reactor(&self, notifier: PrimeNotifier) -> Result<(), ReactorError>;

    /// Reverses [`Self::bind_reactor`].
    fn unbind_reactor(&self);
}
