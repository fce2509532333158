//! Error types for source/sink wiring and scheduling.

use citrine_types::SourceId;
use thiserror::Error;

/// Failure raised by a sink while consuming an event.
///
/// Sinks are application code; the reactor treats any sink failure as fatal
/// for the current `run_one`, restores its scheduling invariants, and
/// propagates the error to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sink failure: {message}")]
pub struct SinkError {
    message: String,
}

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// All errors produced by the reactor layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactorError {
    /// A sink was offered events of a payload type it does not consume.
    /// Both type descriptors are included so mis-wirings are diagnosable
    /// from the message alone.
    #[error("sink type mismatch: source delivers `{offered}`, sink consumes `{expected}`")]
    TypeMismatch {
        /// Payload type the sink actually consumes.
        expected: &'static str,
        /// Payload type the source delivers.
        offered: &'static str,
    },

    /// A source may be bound to at most one reactor at a time.
    #[error("source {source_id} is already attached to a reactor")]
    AlreadyAttached { source_id: SourceId },

    /// `publish` on a secondary source after `mark_upstream_exhausted`;
    /// indicates a protocol bug upstream.
    #[error("publish on source {source_id} after upstream exhausted")]
    UpstreamExhausted { source_id: SourceId },

    /// A sink failed during fan-out.
    #[error(transparent)]
    Sink(#[from] SinkError),
}
