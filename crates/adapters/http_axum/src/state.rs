//! Shared application state for axum handlers.

use std::sync::Arc;

use gadgethub_app::api::ApiHandler;
use gadgethub_app::event_bus::InProcessBus;
use gadgethub_app::ports::BroadcastPublisher;

/// Application state shared across all axum handlers.
///
/// `Clone` is implemented manually so the publisher itself does not need to
/// be `Clone`; only the `Arc` wrappers are cloned.
pub struct AppState<P> {
    /// Executes API requests.
    pub handler: ApiHandler<P>,
    /// Bus whose messages are streamed to SSE listeners.
    pub bus: Arc<InProcessBus>,
}

impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            bus: Arc::clone(&self.bus),
        }
    }
}

impl<P> AppState<P>
where
    P: BroadcastPublisher + 'static,
{
    pub fn new(handler: ApiHandler<P>, bus: Arc<InProcessBus>) -> Self {
        Self { handler, bus }
    }
}
