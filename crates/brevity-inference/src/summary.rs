//! Summary-generation bridge.
//!
//! The bridge is the producer side of a bounded channel: a spawned task pulls
//! fragments from the completion model and forwards them, then sends exactly
//! one terminal event. The returned [`SummaryStream`] is the consumer side.
//! Dropping it closes the channel; the producer notices, drops the upstream
//! stream (which releases its HTTP connection) and exits.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use brevity_core::{Error, Result};

use crate::completion::{FragmentStream, StreamingCompletion};

/// Fixed instruction placed before the note content.
pub const SUMMARY_PROMPT_PREFIX: &str =
    "Summarize the following note content in a concise paragraph:\n\n";

/// Default number of fragments buffered between producer and consumer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Wrap note content in the summary instruction.
pub fn build_prompt(content: &str) -> String {
    format!("{}{}", SUMMARY_PROMPT_PREFIX, content)
}

/// One item delivered to a summary consumer.
#[derive(Debug)]
pub enum SummaryEvent {
    /// Next piece of text, in order.
    Fragment(String),
    /// Generation finished; carries the whole summary.
    Done(String),
    /// Generation failed. Text received so far must not be kept as final.
    Failed(Error),
}

impl SummaryEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SummaryEvent::Fragment(_))
    }
}

/// Turns note content into a stream of summary fragments.
#[derive(Clone)]
pub struct SummaryBridge {
    backend: Arc<dyn StreamingCompletion>,
    channel_capacity: usize,
}

impl SummaryBridge {
    pub fn new(backend: Arc<dyn StreamingCompletion>) -> Self {
        Self {
            backend,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Start summarizing `content`.
    ///
    /// Blank content fails with a validation error before the model is
    /// contacted. A model that cannot be reached fails here with
    /// [`Error::Upstream`]; failures after that arrive as
    /// [`SummaryEvent::Failed`].
    pub async fn summarize(&self, content: &str) -> Result<SummaryStream> {
        if content.trim().is_empty() {
            return Err(Error::invalid_field("content", "Content is required"));
        }

        let prompt = build_prompt(content);
        let upstream = self.backend.complete_stream(&prompt).await?;

        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let model = self.backend.model_name().to_string();
        tokio::spawn(produce(upstream, tx, model, prompt.len()));

        Ok(SummaryStream::new(rx))
    }
}

/// Forward upstream fragments into `tx` until done, failed or abandoned.
async fn produce(
    mut upstream: FragmentStream,
    tx: mpsc::Sender<SummaryEvent>,
    model: String,
    prompt_len: usize,
) {
    let start = Instant::now();
    let mut summary = String::new();
    let mut fragment_count = 0usize;

    loop {
        let next = tokio::select! {
            _ = tx.closed() => {
                debug!(
                    subsystem = "inference",
                    component = "summary",
                    fragment_count,
                    "Consumer went away; releasing upstream stream"
                );
                return;
            }
            item = upstream.next() => item,
        };

        let terminal = match next {
            Some(Ok(fragment)) => {
                if fragment.is_empty() {
                    continue;
                }
                trace!(fragment_len = fragment.len(), "Summary fragment");
                summary.push_str(&fragment);
                fragment_count += 1;
                if tx.send(SummaryEvent::Fragment(fragment)).await.is_err() {
                    return;
                }
                continue;
            }
            Some(Err(e)) => {
                let err = match e {
                    Error::StreamInterrupted(_) => e,
                    other => Error::StreamInterrupted(other.to_string()),
                };
                warn!(
                    subsystem = "inference",
                    component = "summary",
                    model = %model,
                    fragment_count,
                    error = %err,
                    "Summary stream interrupted"
                );
                SummaryEvent::Failed(err)
            }
            None if summary.trim().is_empty() => {
                warn!(
                    subsystem = "inference",
                    component = "summary",
                    model = %model,
                    "Model returned no text"
                );
                SummaryEvent::Failed(Error::Upstream(
                    "Model returned an empty summary".to_string(),
                ))
            }
            None => {
                info!(
                    subsystem = "inference",
                    component = "summary",
                    op = "summarize",
                    model = %model,
                    prompt_len,
                    response_len = summary.len(),
                    fragment_count,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Summary generated"
                );
                SummaryEvent::Done(std::mem::take(&mut summary))
            }
        };

        let _ = tx.send(terminal).await;
        return;
    }
}

/// Consumer side of a summary in progress.
///
/// Yields fragments in order, then exactly one terminal event, then ends.
pub struct SummaryStream {
    rx: mpsc::Receiver<SummaryEvent>,
    finished: bool,
}

impl SummaryStream {
    fn new(rx: mpsc::Receiver<SummaryEvent>) -> Self {
        Self {
            rx,
            finished: false,
        }
    }

    /// Wait for the whole summary. Partial text is discarded on failure.
    pub async fn collect_summary(mut self) -> Result<String> {
        while let Some(event) = self.next().await {
            match event {
                SummaryEvent::Fragment(_) => {}
                SummaryEvent::Done(summary) => return Ok(summary),
                SummaryEvent::Failed(e) => return Err(e),
            }
        }
        Err(Error::StreamInterrupted(
            "Summary producer stopped without a result".to_string(),
        ))
    }

    /// Fragments only; a failure becomes the final `Err` item.
    pub fn into_fragments(self) -> FragmentStream {
        Box::pin(self.filter_map(|event| async move {
            match event {
                SummaryEvent::Fragment(text) => Some(Ok(text)),
                SummaryEvent::Done(_) => None,
                SummaryEvent::Failed(e) => Some(Err(e)),
            }
        }))
    }
}

impl Stream for SummaryStream {
    type Item = SummaryEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                if event.is_terminal() {
                    self.finished = true;
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                // Producer exited without a terminal event
                self.finished = true;
                Poll::Ready(Some(SummaryEvent::Failed(Error::StreamInterrupted(
                    "Summary producer stopped without a result".to_string(),
                ))))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
