//! Model collaborator.
//!
//! The engine sees a single capability: prompt text in, completion text out.
//! Closures implement [`Generator`], so tests plug in a stub without a
//! network.

mod ollama;

pub use ollama::OllamaGenerator;

use std::time::Duration;

use serde_json::Value;

use crate::prompt::PromptText;

/// A request to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Prompt text.
    pub prompt: PromptText,
    /// Model identifier, e.g. `qwen2.5-coder`.
    pub model_id: String,
    /// JSON schema for structured output, when the model supports it.
    pub schema: Option<Value>,
}

/// The model's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Raw completion text.
    pub text: String,
}

impl Completion {
    /// Wraps raw text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A failed model call. Always recoverable: the definition is skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// No answer within the per-request timeout.
    #[error("model call timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    /// Connection-level failure.
    #[error("cannot reach model host {host} (is Ollama running?): {message}")]
    Transport {
        /// Host that was contacted.
        host: String,
        /// Underlying error.
        message: String,
    },
    /// The host answered with an error status.
    #[error("model host returned HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },
    /// The host answered with something that is not a chat response.
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
}

/// Text generation capability.
pub trait Generator: Send + Sync {
    /// Generates a completion for `request`.
    ///
    /// # Errors
    /// Returns [`ModelError`] when the call fails or times out.
    fn generate(&self, request: &GenerationRequest) -> Result<Completion, ModelError>;
}

impl<F> Generator for F
where
    F: Fn(&GenerationRequest) -> Result<Completion, ModelError> + Send + Sync,
{
    fn generate(&self, request: &GenerationRequest) -> Result<Completion, ModelError> {
        self(request)
    }
}
