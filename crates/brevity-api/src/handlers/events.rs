//! Note change feed.
//!
//! Clients connect to `/api/v1/events` and receive `note.created`,
//! `note.updated` and `note.deleted` events for their own notes only. A
//! `lagged` event means some events were dropped and cached views should be
//! refetched.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::StreamExt as _;

use brevity_core::EventEnvelope;

use crate::extract::RequireCaller;
use crate::AppState;

/// SSE stream of the caller's note change events.
pub async fn note_events(
    State(state): State<AppState>,
    auth: RequireCaller,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let owner = auth.caller.id;
    let rx = state.events.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(
        move |result: Result<EventEnvelope, BroadcastStreamRecvError>| match result {
            Ok(envelope) if envelope.owner_id == owner => {
                match serde_json::to_string(&envelope) {
                    Ok(json) => Some(Ok(Event::default()
                        .event(envelope.event_type.clone())
                        .id(envelope.event_id.to_string())
                        .data(json))),
                    Err(_) => None,
                }
            }
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::debug!(subsystem = "api", component = "events", skipped, "Subscriber lagged");
                Some(Ok(Event::default()
                    .event("lagged")
                    .data(serde_json::json!({ "skipped": skipped }).to_string())))
            }
        },
    );

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("keepalive"),
    )
}
