//! Error types for Eventide core.

use eventide_bus::BusError;
use eventide_journal::JournalError;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in Eventide core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Journal error.
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),

    /// Message bus error.
    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    /// JSON codec error.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No decoder is registered for a type tag.
    #[error("unknown type tag: {type_tag}")]
    UnknownType {
        /// The unregistered tag.
        type_tag: String,
    },

    /// A stream holds a snapshot but its entity cannot be restored from one.
    #[error("stream {stream} has a snapshot but the entity does not support snapshots")]
    SnapshotUnsupported {
        /// Name of the stream.
        stream: String,
    },
}

impl CoreError {
    /// Creates an unknown type error.
    pub fn unknown_type(type_tag: impl Into<String>) -> Self {
        Self::UnknownType {
            type_tag: type_tag.into(),
        }
    }

    /// Returns true if this is an optimistic concurrency failure from the journal.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Journal(err) if err.is_conflict())
    }
}
