//! In-process broadcast bus backed by a tokio broadcast channel.

use tokio::sync::broadcast;

use crate::ports::{BroadcastPublisher, OutboundMessage};

/// In-process bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the message is simply dropped).
pub struct InProcessBus {
    sender: broadcast::Sender<OutboundMessage>,
}

impl InProcessBus {
    /// Create a new bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to messages on this bus.
    ///
    /// Returns a receiver that will get all messages published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OutboundMessage> {
        self.sender.subscribe()
    }

    /// Number of live receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl BroadcastPublisher for InProcessBus {
    fn publish(&self, message: OutboundMessage) -> usize {
        // send fails only when there are zero receivers
        self.sender.send(message).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(id: &str) -> OutboundMessage {
        OutboundMessage::new("gadget/update", json!({"id": id}))
    }

    #[tokio::test]
    async fn should_deliver_message_to_subscriber() {
        let bus = InProcessBus::new(16);
        let mut rx = bus.subscribe();

        assert_eq!(bus.publish(message("lamp1")), 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.payload["id"], "lamp1");
    }

    #[tokio::test]
    async fn should_deliver_message_to_multiple_subscribers() {
        let bus = InProcessBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        assert_eq!(bus.publish(message("fan")), 2);

        assert_eq!(rx1.recv().await.unwrap(), message("fan"));
        assert_eq!(rx2.recv().await.unwrap(), message("fan"));
    }

    #[test]
    fn should_succeed_when_no_subscribers() {
        let bus = InProcessBus::new(16);
        assert_eq!(bus.publish(message("lamp1")), 0);
        assert_eq!(bus.receiver_count(), 0);
    }

    #[tokio::test]
    async fn should_not_deliver_messages_published_before_subscription() {
        let bus = InProcessBus::new(16);
        bus.publish(message("early"));

        let mut rx = bus.subscribe();
        bus.publish(message("later"));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.payload["id"], "later");
    }
}
