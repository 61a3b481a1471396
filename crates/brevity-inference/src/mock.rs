//! Scripted completion backend for deterministic testing.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use brevity_inference::mock::MockCompletionBackend;
//!
//! let backend = MockCompletionBackend::new()
//!     .with_fragments(["Milk ", "and eggs."])
//!     .failing_after(1, "connection reset");
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::{stream, StreamExt};

use brevity_core::{Error, Result};

use crate::completion::{FragmentStream, StreamingCompletion};

#[derive(Debug, Clone, Default)]
struct MockConfig {
    fragments: Vec<String>,
    fail_after: Option<(usize, String)>,
    open_error: Option<String>,
    hold_open: bool,
}

/// Completion backend that replays scripted fragments.
#[derive(Clone)]
pub struct MockCompletionBackend {
    config: Arc<MockConfig>,
    prompts: Arc<Mutex<Vec<String>>>,
    released: Arc<AtomicBool>,
}

/// Sets the flag when the stream holding it is dropped.
struct ReleaseGuard(Arc<AtomicBool>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl Default for MockCompletionBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCompletionBackend {
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig {
                fragments: vec!["Mock summary.".to_string()],
                ..Default::default()
            }),
            prompts: Arc::new(Mutex::new(Vec::new())),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Fragments emitted, in order, by every stream.
    pub fn with_fragments<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::make_mut(&mut self.config).fragments = fragments.into_iter().map(Into::into).collect();
        self
    }

    /// Emit `n` fragments, then fail mid-stream.
    pub fn failing_after(mut self, n: usize, message: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).fail_after = Some((n, message.into()));
        self
    }

    /// Fail before any fragment, as an unreachable model would.
    pub fn failing_to_open(mut self, message: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).open_error = Some(message.into());
        self
    }

    /// Never end the stream after the scripted fragments.
    pub fn holding_open(mut self) -> Self {
        Arc::make_mut(&mut self.config).hold_open = true;
        self
    }

    /// Number of `complete_stream` calls so far, including failed opens.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().ok().and_then(|p| p.last().cloned())
    }

    /// Whether the most recent stream has been dropped.
    pub fn was_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamingCompletion for MockCompletionBackend {
    async fn complete_stream(&self, prompt: &str) -> Result<FragmentStream> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Some(ref message) = self.config.open_error {
            return Err(Error::Upstream(message.clone()));
        }

        let mut items: Vec<Result<String>> = Vec::new();
        for (i, fragment) in self.config.fragments.iter().enumerate() {
            if let Some((n, ref message)) = self.config.fail_after {
                if i == n {
                    items.push(Err(Error::StreamInterrupted(message.clone())));
                    break;
                }
            }
            items.push(Ok(fragment.clone()));
        }
        if let Some((n, ref message)) = self.config.fail_after {
            if n >= self.config.fragments.len() {
                items.push(Err(Error::StreamInterrupted(message.clone())));
            }
        }

        self.released.store(false, Ordering::SeqCst);
        let guard = ReleaseGuard(self.released.clone());

        let scripted = stream::iter(items);
        let fragments: FragmentStream = if self.config.hold_open {
            Box::pin(scripted.chain(stream::pending()))
        } else {
            Box::pin(scripted)
        };

        Ok(Box::pin(fragments.map(move |item| {
            let _held = &guard;
            item
        })))
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
