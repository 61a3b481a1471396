//! Summary streaming handlers.
//!
//! Two transports over the same bridge:
//!
//! - `POST /api/v1/summarize` writes fragments into a chunked `text/plain`
//!   body as they arrive. A failure after the first fragment aborts the body.
//! - `POST /api/v1/summarize/events` sends `fragment` events, then exactly
//!   one `done` (full summary) or `error` (user-safe message) event.
//!
//! Closing the connection drops the summary stream, which stops generation
//! and releases the upstream request.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;

use brevity_inference::{SummaryEvent, SummaryStream};

use crate::extract::RequireCaller;
use crate::{ApiError, AppState};

/// Text to summarize. `content` wins when both fields are sent.
#[derive(Debug, Deserialize)]
pub struct SummarizeBody {
    pub content: Option<String>,
    pub prompt: Option<String>,
}

impl SummarizeBody {
    fn into_content(self) -> String {
        self.content.or(self.prompt).unwrap_or_default()
    }
}

async fn open_stream(
    state: &AppState,
    auth: &RequireCaller,
    body: Result<Json<SummarizeBody>, JsonRejection>,
) -> Result<SummaryStream, ApiError> {
    let Json(body) = body?;
    let content = body.into_content();
    tracing::debug!(
        subsystem = "api",
        component = "summary",
        owner_id = %auth.caller.id,
        content_len = content.len(),
        "Summary requested"
    );
    Ok(state.summary.summarize(&content).await?)
}

/// Stream a summary as plain text.
///
/// # Returns
/// - 200 OK with a chunked `text/plain` body
/// - 401 Unauthorized without a live session
/// - 422 Unprocessable Entity if the content is empty
/// - 502 Bad Gateway if the model cannot be reached
pub async fn summarize_text(
    State(state): State<AppState>,
    auth: RequireCaller,
    body: Result<Json<SummarizeBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let stream = open_stream(&state, &auth, body).await?;

    let chunks = stream.into_fragments().map(|item| {
        item.map(Bytes::from)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.user_message()))
    });

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(chunks),
    )
        .into_response())
}

/// SSE field values may not carry `\r`; fold CRLF and bare CR into `\n`,
/// which `Event::data` splits into `data:` lines.
fn sse_data(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

fn to_sse_event(event: SummaryEvent) -> Event {
    match event {
        SummaryEvent::Fragment(text) => Event::default().event("fragment").data(sse_data(&text)),
        SummaryEvent::Done(summary) => Event::default().event("done").data(sse_data(&summary)),
        SummaryEvent::Failed(err) => Event::default()
            .event("error")
            .data(sse_data(&err.user_message())),
    }
}

/// Stream a summary as Server-Sent Events.
///
/// # Returns
/// - 200 OK with `text/event-stream`
/// - 401 Unauthorized without a live session
/// - 422 Unprocessable Entity if the content is empty
/// - 502 Bad Gateway if the model cannot be reached
pub async fn summarize_events(
    State(state): State<AppState>,
    auth: RequireCaller,
    body: Result<Json<SummarizeBody>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let stream = open_stream(&state, &auth, body).await?;
    let events = stream.map(|event| Ok(to_sse_event(event)));

    Ok(Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("keepalive"),
    ))
}
