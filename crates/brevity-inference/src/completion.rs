//! Streaming completion seam.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use brevity_core::Result;

/// Ordered text fragments from a completion model. Finite and not restartable.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A hosted model that turns a prompt into a stream of text fragments.
///
/// Failing to open the stream is an [`brevity_core::Error::Upstream`]; a
/// failure after the stream is open arrives as an item of the stream.
#[async_trait]
pub trait StreamingCompletion: Send + Sync {
    /// Send `prompt` and start receiving fragments.
    async fn complete_stream(&self, prompt: &str) -> Result<FragmentStream>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}
