//! SSE stream parsing for OpenAI-compatible streaming responses.
//!
//! Network chunks do not align with SSE lines, so bytes are buffered until a
//! full line is available. Decoding happens per line, which keeps multi-byte
//! characters split across chunks intact.

use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::trace;

use brevity_core::{Error, Result};

use super::types::{ChatCompletionChunk, StreamErrorEnvelope};
use crate::completion::FragmentStream;

type ByteStream = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send>>;

struct SseState {
    inner: ByteStream,
    buffer: Vec<u8>,
    pending: VecDeque<Result<String>>,
    done: bool,
}

impl SseState {
    /// Process every complete line currently in the buffer.
    fn drain_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.handle_line(&String::from_utf8_lossy(&line));
            if self.done {
                self.buffer.clear();
                return;
            }
        }
    }

    fn handle_line(&mut self, line: &str) {
        let line = line.trim_end_matches(['\r', '\n']);

        // Blank separators, comments and non-data fields carry no text
        let Some(data) = line.strip_prefix("data:") else {
            return;
        };
        let data = data.trim_start();

        if data == "[DONE]" {
            self.done = true;
            return;
        }

        match parse_sse_data(data) {
            Ok(Some(text)) => self.pending.push_back(Ok(text)),
            Ok(None) => {}
            Err(e) => {
                self.pending.push_back(Err(e));
                self.done = true;
            }
        }
    }
}

/// Parse one `data:` payload. `Ok(None)` means the chunk carried no text.
fn parse_sse_data(data: &str) -> Result<Option<String>> {
    if let Ok(envelope) = serde_json::from_str::<StreamErrorEnvelope>(data) {
        return Err(Error::StreamInterrupted(format!(
            "Model reported an error mid-stream: {}",
            envelope.error.message
        )));
    }
    let chunk = serde_json::from_str::<ChatCompletionChunk>(data)
        .map_err(|e| Error::StreamInterrupted(format!("Failed to parse SSE chunk: {}", e)))?;
    let text = chunk.text();
    Ok((!text.is_empty()).then_some(text))
}

/// Parse SSE stream from OpenAI-compatible endpoint.
///
/// Ends after `data: [DONE]` or when the body ends. A transport error or an
/// unparseable chunk is yielded once as [`Error::StreamInterrupted`] and ends
/// the stream.
pub fn parse_sse_stream(
    stream: impl Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send + 'static,
) -> FragmentStream {
    let state = SseState {
        inner: Box::pin(stream),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        done: false,
    };

    let fragments = futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.done {
                return None;
            }
            match st.inner.next().await {
                Some(Ok(bytes)) => {
                    trace!(chunk_len = bytes.len(), "SSE chunk received");
                    st.buffer.extend_from_slice(&bytes);
                    st.drain_lines();
                }
                Some(Err(e)) => {
                    st.pending
                        .push_back(Err(Error::StreamInterrupted(format!("Stream error: {}", e))));
                    st.done = true;
                }
                None => {
                    // Body ended; a final line may lack its newline
                    let rest = std::mem::take(&mut st.buffer);
                    if !rest.is_empty() {
                        st.handle_line(&String::from_utf8_lossy(&rest));
                    }
                    st.done = true;
                }
            }
        }
    });

    Box::pin(fragments)
}
