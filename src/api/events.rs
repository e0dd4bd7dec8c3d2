use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;

use super::AppState;

/// Admin live feed: every committed event as a named SSE message.
/// Lagging subscribers silently skip what they missed.
pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.engine.notify.subscribe();
    let events = BroadcastStream::new(rx)
        .filter_map(|res| async move { res.ok() })
        .map(|event| {
            let sse = SseEvent::default()
                .event(event.kind())
                .json_data(&event)
                .unwrap_or_else(|_| SseEvent::default().event(event.kind()).data("{}"));
            Ok(sse)
        });
    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
