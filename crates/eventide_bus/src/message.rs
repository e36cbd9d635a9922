//! Messages and the subscriber capability.

use crate::error::BusResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A message delivered to topic subscribers.
///
/// The bus never interprets `payload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message id.
    pub id: String,
    /// Payload type tag.
    #[serde(rename = "type")]
    pub message_type: String,
    /// Serialized payload.
    pub payload: String,
}

impl Message {
    /// Creates a message.
    pub fn new(
        id: impl Into<String>,
        message_type: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            message_type: message_type.into(),
            payload: payload.into(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Message[id={} type={} payload={}]",
            self.id, self.message_type, self.payload
        )
    }
}

/// Receives messages published to a topic.
///
/// Handlers run on the topic's dispatcher thread. A handler that returns
/// an error or panics is logged and skipped; other subscribers and later
/// messages are unaffected.
pub trait Subscriber: Send + Sync {
    /// Handles one message.
    fn handle(&self, message: &Message) -> BusResult<()>;
}

impl<F> Subscriber for F
where
    F: Fn(&Message) -> BusResult<()> + Send + Sync,
{
    fn handle(&self, message: &Message) -> BusResult<()> {
        self(message)
    }
}
