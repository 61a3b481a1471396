//! OpenAI-compatible completion backend implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use brevity_core::{Error, Result};

use super::error::{to_brevity_error, OpenAIErrorCode};
use super::streaming::parse_sse_stream;
use super::types::*;
use crate::completion::{FragmentStream, StreamingCompletion};

/// Gemini's OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Default generation model.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-001";

/// Configuration for OpenAI-compatible backend.
#[derive(Clone)]
pub struct OpenAIConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// API key for authentication (optional for local endpoints).
    pub api_key: Option<String>,
    /// Model to use for generation.
    pub model: String,
    /// Whole-request timeout. `None` leaves the HTTP client's default in place.
    pub timeout_seconds: Option<u64>,
}

impl std::fmt::Debug for OpenAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            timeout_seconds: None,
        }
    }
}

impl OpenAIConfig {
    /// Read `SUMMARY_*` variables. The key falls back to `GEMINI_API_KEY`.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("SUMMARY_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            api_key: std::env::var("SUMMARY_API_KEY")
                .or_else(|_| std::env::var("GEMINI_API_KEY"))
                .ok()
                .filter(|k| !k.is_empty()),
            model: std::env::var("SUMMARY_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            timeout_seconds: std::env::var("SUMMARY_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }
}

/// OpenAI-compatible streaming completion backend.
pub struct OpenAIBackend {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIBackend {
    /// Create a new OpenAI backend with the given configuration.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let mut client_builder = Client::builder();

        if let Some(secs) = config.timeout_seconds {
            client_builder = client_builder.timeout(Duration::from_secs(secs));
        }

        let client = client_builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        if config.api_key.is_none() {
            warn!(
                subsystem = "inference",
                component = "openai",
                "No API key configured; hosted endpoints will reject requests"
            );
        }
        info!(
            subsystem = "inference",
            component = "openai",
            base_url = %config.base_url,
            model = %config.model,
            "Initializing OpenAI-compatible backend"
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIConfig::from_env())
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    /// Build a request with authentication if configured.
    fn build_request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut req = self.client.post(&url);

        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        req.header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
    }
}

#[async_trait]
impl StreamingCompletion for OpenAIBackend {
    async fn complete_stream(&self, prompt: &str) -> Result<FragmentStream> {
        debug!(
            subsystem = "inference",
            component = "openai",
            op = "complete_stream",
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Opening completion stream"
        );

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            temperature: None,
            stream: true,
        };

        let response = self
            .build_request("/chat/completions")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body: OpenAIErrorResponse =
                response.json().await.unwrap_or(OpenAIErrorResponse {
                    error: OpenAIError {
                        message: "Unknown error".to_string(),
                        error_type: "unknown".to_string(),
                        code: None,
                    },
                });
            let code = OpenAIErrorCode::from_response(status.as_u16(), &body.error.error_type);
            warn!(
                subsystem = "inference",
                component = "openai",
                status = status.as_u16(),
                error_type = %body.error.error_type,
                "Completion request rejected"
            );
            return Err(to_brevity_error(
                code,
                &format!("{} returned {}: {}", self.config.model, status, body.error.message),
            ));
        }

        Ok(parse_sse_stream(response.bytes_stream()))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_targets_gemini() {
        let config = OpenAIConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.timeout_seconds.is_none());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = OpenAIConfig {
            api_key: Some("sk-very-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("<redacted>"));
        // Certificate checks are always on; nothing to toggle.
        assert!(!debug.contains("tls"));
    }

    #[test]
    fn test_build_request_url_joins_without_double_slash() {
        let backend = OpenAIBackend::new(OpenAIConfig {
            base_url: "http://localhost:9999/v1/".to_string(),
            ..Default::default()
        })
        .unwrap();
        let req = backend.build_request("/chat/completions").build().unwrap();
        assert_eq!(req.url().as_str(), "http://localhost:9999/v1/chat/completions");
    }
}
