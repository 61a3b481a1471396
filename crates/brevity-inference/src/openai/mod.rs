//! OpenAI-compatible completion backend.
//!
//! Works with any endpoint that speaks the OpenAI chat-completions protocol
//! with `stream: true`. The default target is Gemini's compatibility layer;
//! OpenAI itself, vLLM, Ollama and LM Studio work by changing `base_url`.
//!
//! # Example
//!
//! ```rust,no_run
//! use brevity_inference::openai::{OpenAIBackend, OpenAIConfig};
//! use brevity_inference::StreamingCompletion;
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = OpenAIBackend::new(OpenAIConfig {
//!         base_url: "http://localhost:11434/v1".to_string(), // Ollama
//!         model: "llama3".to_string(),
//!         ..Default::default()
//!     })
//!     .unwrap();
//!
//!     let mut fragments = backend.complete_stream("Say hi").await.unwrap();
//!     while let Some(fragment) = fragments.next().await {
//!         print!("{}", fragment.unwrap());
//!     }
//! }
//! ```

mod backend;
mod error;
mod streaming;
mod types;

pub use backend::{OpenAIBackend, OpenAIConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use error::{to_brevity_error, OpenAIErrorCode};
pub use streaming::parse_sse_stream;
pub use types::{
    ChatChunkChoice, ChatCompletionChunk, ChatCompletionRequest, ChatDelta, ChatMessage,
    OpenAIError, OpenAIErrorResponse,
};
