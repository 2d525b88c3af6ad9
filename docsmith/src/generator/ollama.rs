//! Ollama chat client.
//!
//! Calls `POST /api/chat` on the configured host (default
//! `http://localhost:11434`) with streaming off and `format` set to the
//! response schema. Blocking, so it runs directly on rayon workers.

use std::error::Error as _;
use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Completion, GenerationRequest, Generator, ModelError};
use crate::constants::{DEFAULT_HOST, HOST_ENV_VAR};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a Value>,
    options: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Generator backed by a local or remote Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    agent: ureq::Agent,
    host: String,
    timeout: Duration,
}

impl OllamaGenerator {
    /// Creates a client for `host` with a per-request `timeout`.
    #[must_use]
    pub fn new(host: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout.min(Duration::from_secs(10)))
            .timeout(timeout)
            .build();
        Self {
            agent,
            host: normalize_host(host),
            timeout,
        }
    }

    /// Host resolution order: explicit value, `OLLAMA_HOST`, default.
    #[must_use]
    pub fn resolve_host(explicit: Option<&str>) -> String {
        explicit
            .map(str::to_owned)
            .or_else(|| std::env::var(HOST_ENV_VAR).ok().filter(|h| !h.trim().is_empty()))
            .map_or_else(|| DEFAULT_HOST.to_owned(), |h| normalize_host(&h))
    }

    /// The base URL requests go to.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.host)
    }
}

impl Generator for OllamaGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<Completion, ModelError> {
        let body = ChatRequest {
            model: &request.model_id,
            messages: [ChatMessage {
                role: "user",
                content: request.prompt.as_str(),
            }],
            stream: false,
            format: request.schema.as_ref(),
            options: serde_json::json!({ "temperature": 0 }),
        };

        match self.agent.post(&self.endpoint()).send_json(&body) {
            Ok(response) => {
                let chat: ChatResponse = response
                    .into_json()
                    .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;
                Ok(Completion::new(chat.message.content))
            }
            Err(ureq::Error::Status(status, response)) => Err(ModelError::Http {
                status,
                body: response.into_string().unwrap_or_default().trim().to_owned(),
            }),
            Err(ureq::Error::Transport(transport)) => {
                if is_timeout(&transport) {
                    Err(ModelError::Timeout(self.timeout))
                } else {
                    Err(ModelError::Transport {
                        host: self.host.clone(),
                        message: transport.to_string(),
                    })
                }
            }
        }
    }
}

/// Adds a scheme when missing and drops trailing slashes.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_owned()
    } else {
        format!("http://{host}")
    }
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    let mut source = transport.source();
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if matches!(io_err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) {
                return true;
            }
        }
        source = err.source();
    }
    false
}
