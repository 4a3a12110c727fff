//! HTTP rendition of the request port.

use gadgethub_app::ports::Request;
use serde_json::Value;
use tokio::sync::oneshot;

/// One `POST /api/{path}` call, answered through a oneshot channel.
#[derive(Debug)]
pub struct HttpRequest {
    path: String,
    payload: Value,
    reply: oneshot::Sender<Value>,
}

impl HttpRequest {
    /// Create a request and the receiver its answer will arrive on.
    #[must_use]
    pub fn new(path: impl Into<String>, payload: Value) -> (Self, oneshot::Receiver<Value>) {
        let (reply, receiver) = oneshot::channel();
        let request = Self {
            path: path.into(),
            payload,
            reply,
        };
        (request, receiver)
    }
}

impl Request for HttpRequest {
    fn path(&self) -> &str {
        &self.path
    }

    fn payload(&self) -> &Value {
        &self.payload
    }

    fn respond(self, data: Value) {
        if self.reply.send(data).is_err() {
            tracing::debug!(path = %self.path, "caller went away before the response");
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn should_expose_path_and_payload() {
        let (request, _reply) = HttpRequest::new("gadget/get", json!({"id": "lamp1"}));
        assert_eq!(request.path(), "gadget/get");
        assert_eq!(request.payload()["id"], "lamp1");
    }

    #[tokio::test]
    async fn should_deliver_response_to_receiver() {
        let (request, reply) = HttpRequest::new("gadget/list", Value::Null);
        request.respond(json!({"gadgets": []}));
        assert_eq!(reply.await.unwrap(), json!({"gadgets": []}));
    }

    #[test]
    fn should_tolerate_dropped_receiver() {
        let (request, reply) = HttpRequest::new("gadget/list", Value::Null);
        drop(reply);
        request.respond(json!({}));
    }
}
