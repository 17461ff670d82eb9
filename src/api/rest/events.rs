use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

use crate::state::AppState;

/// Server-sent stream of tracking updates (sample plus recomputed waiting
/// points). Lagged receivers skip ahead.
pub async fn tracking_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.tracking_events_tx.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(update) => match Event::default().event("tracking").json_data(&update) {
            Ok(event) => Some(Ok(event)),
            Err(err) => {
                warn!(error = %err, "failed to serialize tracking update for sse");
                None
            }
        },
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
