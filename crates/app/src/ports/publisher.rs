//! Publisher port — outbound messages pushed to every connected transport.

use serde::Serialize;
use serde_json::Value;

/// A message sent from the hub to its clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMessage {
    pub path: String,
    pub payload: Value,
}

impl OutboundMessage {
    #[must_use]
    pub fn new(path: impl Into<String>, payload: Value) -> Self {
        Self {
            path: path.into(),
            payload,
        }
    }
}

/// Fans outbound messages out to transports.
///
/// Publishing is fire-and-forget: a message with no listener is dropped.
pub trait BroadcastPublisher: Send + Sync {
    /// Publish a message; returns how many listeners received it.
    fn publish(&self, message: OutboundMessage) -> usize;
}

impl<T: BroadcastPublisher> BroadcastPublisher for std::sync::Arc<T> {
    fn publish(&self, message: OutboundMessage) -> usize {
        (**self).publish(message)
    }
}
