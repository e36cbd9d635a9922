//! Error types for the journal.

use thiserror::Error;

/// Result type for journal operations.
pub type JournalResult<T> = Result<T, JournalError>;

/// Errors that can occur while writing to or reading from a journal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JournalError {
    /// The expected stream version did not match the stream's current version.
    ///
    /// Nothing was appended. Re-read the stream and retry with the
    /// version it reports.
    #[error(
        "cannot write to stream '{stream}' with expected version {expected} because the current version is {actual}"
    )]
    ConcurrencyConflict {
        /// Stream the write targeted.
        stream: String,
        /// Version supplied by the writer.
        expected: i64,
        /// Version of the last entry in the stream, or -1 if the stream does not exist.
        actual: i64,
    },

    /// A read asked for an entry beyond the end of the stream.
    #[error("the id does not exist: {id}")]
    IdOutOfRange {
        /// Relative id that was requested.
        id: i64,
    },

    /// An acknowledgment was ahead of the reader's position.
    #[error("the id is out of range: acknowledged {id} while expecting {read_sequence}")]
    AckOutOfRange {
        /// Id passed to `acknowledge`.
        id: i64,
        /// Position the reader was waiting on.
        read_sequence: i64,
    },
}

impl JournalError {
    /// Creates a concurrency conflict error.
    pub fn concurrency_conflict(stream: impl Into<String>, expected: i64, actual: i64) -> Self {
        Self::ConcurrencyConflict {
            stream: stream.into(),
            expected,
            actual,
        }
    }

    /// Returns true if this error is an optimistic concurrency failure.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_names_both_versions() {
        let err = JournalError::concurrency_conflict("order_1", 3, 5);
        let msg = err.to_string();
        assert!(msg.contains("order_1"));
        assert!(msg.contains("expected version 3"));
        assert!(msg.contains("current version is 5"));
        assert!(err.is_conflict());
    }

    #[test]
    fn out_of_range_is_not_conflict() {
        assert!(!JournalError::IdOutOfRange { id: 4 }.is_conflict());
    }
}
