//! Generic API call: the URL names the route, the body carries the payload.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use serde_json::{Map, Value};

use gadgethub_app::api::Route;
use gadgethub_app::ports::BroadcastPublisher;
use gadgethub_domain::error::ValidationError;

use crate::error::ApiError;
use crate::request::HttpRequest;
use crate::state::AppState;

/// `POST /api/{*path}`
///
/// An empty body stands for `{}` so queries without arguments can be sent
/// bare.
///
/// # Errors
///
/// Returns [`ApiError::UnknownPath`] for paths outside the route table and a
/// validation error when the body is not JSON.
pub async fn call<P>(
    State(state): State<AppState<P>>,
    Path(path): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError>
where
    P: BroadcastPublisher + 'static,
{
    let path = path.trim_start_matches('/').to_string();
    if Route::from_path(&path).is_none() {
        return Err(ApiError::UnknownPath(path));
    }
    let payload = parse_body(&body)?;

    let (request, reply) = HttpRequest::new(path.clone(), payload);
    if !state.handler.handle(request) {
        return Err(ApiError::UnknownPath(path));
    }
    reply.await.map(Json).map_err(|_| ApiError::NoReply)
}

fn parse_body(body: &[u8]) -> Result<Value, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(body).map_err(|err| ValidationError::MalformedPayload(err.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn should_read_empty_body_as_empty_object() {
        assert_eq!(parse_body(b"").unwrap(), json!({}));
        assert_eq!(parse_body(b"  \n").unwrap(), json!({}));
    }

    #[test]
    fn should_parse_json_body() {
        assert_eq!(parse_body(br#"{"id":"lamp1"}"#).unwrap(), json!({"id": "lamp1"}));
    }

    #[test]
    fn should_reject_body_that_is_not_json() {
        assert!(matches!(
            parse_body(b"{not json"),
            Err(ValidationError::MalformedPayload(_))
        ));
    }
}
