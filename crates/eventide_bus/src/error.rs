//! Error types for the message bus.

use std::io;
use thiserror::Error;

/// Result type for bus operations.
pub type BusResult<T> = Result<T, BusError>;

/// Errors that can occur in the message bus.
#[derive(Debug, Error)]
pub enum BusError {
    /// The topic was closed and no longer accepts messages.
    #[error("topic closed: {name}")]
    TopicClosed {
        /// Name of the topic.
        name: String,
    },

    /// A subscriber failed to handle a message.
    #[error("subscriber failed: {message}")]
    Subscriber {
        /// Description of the failure.
        message: String,
    },

    /// The dispatcher thread could not be started.
    #[error("failed to spawn dispatcher: {0}")]
    Spawn(#[from] io::Error),
}

impl BusError {
    /// Creates a topic closed error.
    pub fn topic_closed(name: impl Into<String>) -> Self {
        Self::TopicClosed { name: name.into() }
    }

    /// Creates a subscriber failure.
    pub fn subscriber(message: impl Into<String>) -> Self {
        Self::Subscriber {
            message: message.into(),
        }
    }
}
