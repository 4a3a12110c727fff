//! Server-Sent Events (SSE) stream of outbound messages.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use gadgethub_app::ports::BroadcastPublisher;

use crate::state::AppState;

/// `GET /api/stream` — SSE stream of everything published on the bus.
///
/// Each message becomes one SSE event named after its path (`gadget/update`,
/// `client/ping`) whose `data:` frame is the JSON payload. The stream runs
/// until the listener disconnects or the bus is closed.
pub async fn stream<P>(
    State(state): State<AppState<P>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>>
where
    P: BroadcastPublisher + 'static,
{
    let receiver = state.bus.subscribe();
    let messages = BroadcastStream::new(receiver).filter_map(|result| match result {
        Ok(message) => match serde_json::to_string(&message.payload) {
            Ok(json) => Some(Ok(Event::default().event(message.path).data(json))),
            Err(err) => {
                tracing::warn!(%err, "failed to serialize message for SSE stream");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "SSE listener lagged, some messages were dropped");
            None
        }
    });

    Sse::new(messages).keep_alive(KeepAlive::default())
}
