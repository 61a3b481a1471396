//! # brevity-inference
//!
//! Summary generation for brevity.
//!
//! - [`StreamingCompletion`]: the seam to a hosted completion model
//! - [`openai`]: an OpenAI-compatible implementation (Gemini by default)
//! - [`SummaryBridge`]: wraps note content in the summary prompt and relays
//!   the model's fragments through a cancellable channel

pub mod completion;
pub mod openai;
pub mod summary;

// Mock completion backend for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use brevity_core::*;

pub use completion::{FragmentStream, StreamingCompletion};
pub use openai::{OpenAIBackend, OpenAIConfig};
pub use summary::{build_prompt, SummaryBridge, SummaryEvent, SummaryStream};
