//! Outbound and inbound message types

use crate::error::Result;
use serde::Serialize;
use serde_json::Value;

/// One result delivered on a receive session's output channel
///
/// `Ok` carries raw payload bytes exactly as the broker delivered them;
/// decoding is the caller's job. `Err` is the terminal error of the session.
pub type InboundResult = Result<Vec<u8>>;

/// Application message bound for a topic
///
/// The body is captured as a JSON value at construction time, so the message
/// is immutable once built. A body that encodes to JSON `null` counts as an
/// absent message and is rejected by the facade.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    topic: String,
    body: Value,
}

impl OutboundMessage {
    /// Capture `message` for delivery to `topic`
    ///
    /// # Errors
    ///
    /// Returns a serialization error if `message` cannot be represented as JSON
    /// (for example a map with non-string keys).
    pub fn new<T: Serialize + ?Sized>(topic: impl Into<String>, message: &T) -> Result<Self> {
        let body = serde_json::to_value(message)?;
        Ok(Self::from_value(topic, body))
    }

    /// Build from an already encoded JSON value
    pub fn from_value(topic: impl Into<String>, body: Value) -> Self {
        Self {
            topic: topic.into(),
            body,
        }
    }

    /// Target topic name
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Captured message body
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// True when there is no message to send
    pub fn is_empty(&self) -> bool {
        self.body.is_null()
    }

    /// Encode the body to its wire payload
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.body)?)
    }
}
