//! Error and Result types for septum operations.

use std::str::Utf8Error;
use thiserror::Error;

/// A convenience `Result` type for event codec operations.
pub type Result<T> = std::result::Result<T, EventError>;

/// The error type for encoding and decoding events.
///
/// Every variant names the event field that was being processed when the
/// failure happened. Decoding errors mean the input is corrupt or untrusted
/// and should be discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// A time field is not expressed in UTC.
    #[error("Event.{field} is not in UTC time (offset {offset_secs}s)")]
    NonUtcTimestamp {
        /// Name of the offending field.
        field: &'static str,
        /// Offset from UTC in seconds.
        offset_secs: i32,
    },

    /// A time field falls on a leap second, which the wire format cannot
    /// carry.
    #[error("Event.{field} is a leap second and cannot be encoded")]
    LeapSecond {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The buffer ended before a varint was complete.
    #[error("Truncated input while decoding Event.{field}")]
    Truncated {
        /// Name of the field being decoded.
        field: &'static str,
    },

    /// A varint does not fit in 64 bits.
    #[error("Varint overflow while decoding Event.{field}")]
    VarintOverflow {
        /// Name of the field being decoded.
        field: &'static str,
    },

    /// A length prefix is negative or larger than the remaining buffer.
    #[error("Malformed length for Event.{field}: declared {declared}, {remaining} bytes remaining")]
    MalformedLength {
        /// Name of the field being decoded.
        field: &'static str,
        /// Length read from the prefix.
        declared: i64,
        /// Bytes left in the buffer after the prefix.
        remaining: usize,
    },

    /// Decoded seconds/nanoseconds do not form a representable instant.
    #[error("Event.{field} is out of range: {seconds}s {nanos}ns")]
    TimestampOutOfRange {
        /// Name of the field being decoded.
        field: &'static str,
        /// Decoded Unix seconds.
        seconds: i64,
        /// Decoded nanoseconds.
        nanos: i64,
    },

    /// The kind bytes are not valid UTF-8.
    #[error("Event.kind is not valid UTF-8: {0}")]
    InvalidKind(#[from] Utf8Error),
}

/// The error type returned by [`Pipeline::process`](crate::Pipeline::process).
///
/// `E` is the error type produced by the pipeline's process steps. A step
/// failure is returned unchanged in [`PipelineError::Step`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError<E> {
    /// No event was passed to the pipeline.
    #[error("No event to process")]
    MissingEvent,

    /// A process step failed; the remaining steps did not run.
    #[error("Pipeline step failed: {0}")]
    Step(E),
}

impl<E> PipelineError<E> {
    /// Returns the step error, if this is a step failure.
    pub fn into_step(self) -> Option<E> {
        match self {
            Self::Step(err) => Some(err),
            Self::MissingEvent => None,
        }
    }
}
