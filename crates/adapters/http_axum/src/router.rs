//! Axum router assembly.

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use gadgethub_app::ports::BroadcastPublisher;

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Mounts the API under `/api`, the ping endpoint under `/clients` and a
/// health check. Includes a [`TraceLayer`] that logs each HTTP
/// request/response at the `DEBUG` level using the `tracing` ecosystem.
pub fn build<P>(state: AppState<P>) -> Router
where
    P: BroadcastPublisher + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/clients/{id}/ping", post(crate::api::ping::ping::<P>))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
