//! JSON API over HTTP.
//!
//! - `POST /api/{*path}` — one API request, the body is its JSON payload
//! - `GET  /api/stream`  — SSE stream of outbound messages
//! - `POST /clients/{id}/ping` — wait for a client's acknowledgement

pub mod call;
pub mod ping;
pub mod sse;

use axum::Router;
use axum::routing::{get, post};

use gadgethub_app::ports::BroadcastPublisher;

use crate::state::AppState;

/// Routes mounted under `/api`.
pub fn routes<P>() -> Router<AppState<P>>
where
    P: BroadcastPublisher + 'static,
{
    Router::new()
        .route("/stream", get(sse::stream::<P>))
        .route("/{*path}", post(call::call::<P>))
}
