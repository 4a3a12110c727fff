//! Acknowledgement tracking for messages sent to clients.
//!
//! The hub publishes a message carrying a fresh correlation token and waits
//! for the client to echo the token back through the API. Waiting is the
//! only bounded wait in the hub; it fails with a [`NoResponseError`] when
//! the client stays silent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;

use gadgethub_domain::error::NoResponseError;

type Waiters = Arc<Mutex<HashMap<String, oneshot::Sender<Value>>>>;

/// Outstanding acknowledgements, keyed by correlation token.
#[derive(Default)]
pub struct PendingAcks {
    waiters: Waiters,
}

impl PendingAcks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start waiting for a new acknowledgement.
    #[must_use]
    pub fn register(&self) -> AckTicket {
        let token = uuid::Uuid::new_v4().to_string();
        let (sender, receiver) = oneshot::channel();
        lock(&self.waiters).insert(token.clone(), sender);
        AckTicket {
            token,
            receiver,
            waiters: Arc::clone(&self.waiters),
        }
    }

    /// Complete the ticket for `token` with `payload`.
    ///
    /// Returns `false` when the token is unknown or already expired.
    pub fn acknowledge(&self, token: &str, payload: Value) -> bool {
        let Some(sender) = lock(&self.waiters).remove(token) else {
            return false;
        };
        sender.send(payload).is_ok()
    }

    /// Number of tickets still waiting.
    #[must_use]
    pub fn pending(&self) -> usize {
        lock(&self.waiters).len()
    }
}

/// A registered wait for one acknowledgement.
#[derive(Debug)]
pub struct AckTicket {
    token: String,
    receiver: oneshot::Receiver<Value>,
    waiters: Waiters,
}

impl AckTicket {
    /// Correlation token to send along with the message.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Wait for the acknowledgement payload.
    ///
    /// The token is released when the ticket is dropped, so a wait that is
    /// cancelled midway leaves nothing behind.
    ///
    /// # Errors
    ///
    /// Returns [`NoResponseError`] when nothing arrives within `timeout`.
    pub async fn wait(mut self, timeout: Duration) -> Result<Value, NoResponseError> {
        match tokio::time::timeout(timeout, &mut self.receiver).await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(_)) | Err(_) => Err(NoResponseError {
                token: self.token.clone(),
                timeout_ms: timeout.as_millis(),
            }),
        }
    }
}

impl Drop for AckTicket {
    fn drop(&mut self) {
        lock(&self.waiters).remove(&self.token);
    }
}

fn lock(
    waiters: &Mutex<HashMap<String, oneshot::Sender<Value>>>,
) -> MutexGuard<'_, HashMap<String, oneshot::Sender<Value>>> {
    waiters.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn should_resolve_with_acknowledged_payload() {
        let acks = PendingAcks::new();
        let ticket = acks.register();
        let token = ticket.token().to_string();

        assert!(acks.acknowledge(&token, json!({"ok": true})));

        let payload = ticket.wait(Duration::from_secs(1)).await.unwrap();
        assert_eq!(payload, json!({"ok": true}));
        assert_eq!(acks.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn should_fail_with_no_response_after_timeout() {
        let acks = PendingAcks::new();
        let ticket = acks.register();
        let token = ticket.token().to_string();

        let err = ticket.wait(Duration::from_millis(250)).await.unwrap_err();

        assert_eq!(err.token, token);
        assert_eq!(err.timeout_ms, 250);
        assert_eq!(acks.pending(), 0);
        assert!(!acks.acknowledge(&token, Value::Null));
    }

    #[tokio::test(start_paused = true)]
    async fn should_release_tokens_of_cancelled_waits() {
        let acks = PendingAcks::new();
        for _ in 0..100 {
            let ticket = acks.register();
            let cancelled =
                tokio::time::timeout(Duration::from_millis(1), ticket.wait(Duration::from_secs(5)))
                    .await;
            assert!(cancelled.is_err());
        }
        assert_eq!(acks.pending(), 0);
    }

    #[test]
    fn should_release_token_when_ticket_is_dropped() {
        let acks = PendingAcks::new();
        let ticket = acks.register();
        let token = ticket.token().to_string();
        drop(ticket);

        assert_eq!(acks.pending(), 0);
        assert!(!acks.acknowledge(&token, Value::Null));
    }

    #[test]
    fn should_ignore_unknown_token() {
        let acks = PendingAcks::new();
        assert!(!acks.acknowledge("nope", Value::Null));
    }

    #[test]
    fn should_issue_distinct_tokens() {
        let acks = PendingAcks::new();
        let a = acks.register();
        let b = acks.register();
        assert_ne!(a.token(), b.token());
        assert_eq!(acks.pending(), 2);
    }
}
