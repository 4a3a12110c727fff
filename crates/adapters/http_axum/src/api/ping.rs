//! Ping a client and wait for its acknowledgement.

use axum::Json;
use axum::extract::{Path, State};
use serde_json::{Value, json};

use gadgethub_app::ports::BroadcastPublisher;

use crate::error::ApiError;
use crate::state::AppState;

/// `POST /clients/{id}/ping`
///
/// Publishes a `client/ping` message and resolves once the client echoes its
/// token through `client/ack`, or fails after the acknowledgement timeout.
///
/// # Errors
///
/// Returns a not-found error for unknown clients and a no-response error when
/// the client stays silent.
pub async fn ping<P>(
    State(state): State<AppState<P>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError>
where
    P: BroadcastPublisher + 'static,
{
    let payload = state.handler.service().ping_client(&id).await?;
    Ok(Json(json!({ "id": id, "payload": payload })))
}
