//! Reasoning backend abstractions.
//!
//! The backend is a stateless text-completion function: prompt in, text
//! out. The same prompt may legitimately produce different text across
//! calls (model non-determinism) — that is expected and is never treated
//! as an error. Every correctness guard lives downstream in the parser.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

mod factory;

#[cfg(feature = "ollama")]
mod ollama;

pub use factory::{BackendFactory, BackendRegistry};

#[cfg(feature = "ollama")]
pub use ollama::{OllamaBackend, OllamaBackendFactory};

/// Errors from completion backends.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The service could not be reached at all (connection refused, DNS).
    #[error("failed to reach backend: {0}")]
    Unreachable(String),

    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("backend returned {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("failed to decode backend response: {0}")]
    DecodeError(String),

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("backend not configured: {0}")]
    NotConfigured(String),
}

impl BackendError {
    /// Whether the client may retry this failure once.
    ///
    /// Only connection-level failures qualify. Decode failures never do:
    /// retrying a non-deterministic generator on bad output would mask
    /// the problem instead of surfacing it.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable(_))
            || matches!(self, Self::ApiError { status: 503, .. })
    }
}

/// Configuration for a single completion request.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Model to use (e.g., "phi3")
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature (0.0 keeps grading as repeatable as the model allows)
    pub temperature: f32,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "phi3".to_string(),
            max_tokens: 1024,
            temperature: 0.0,
            timeout: Duration::from_secs(30),
        }
    }
}

/// A chat message for the completion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system" or "user"
    pub role: String,

    /// Message content
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Response from a completion call.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated text
    pub content: String,

    /// Token usage, when the backend reports it
    pub usage: TokenUsage,

    /// Model that served the request
    pub model: String,
}

/// Token counts reported by the backend for one call.
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Bearer token for backends behind an authenticating proxy.
///
/// Wrapped in [`SecretString`] so the value cannot leak through `Debug`
/// output or error messages; it must be explicitly exposed at the point
/// of use.
pub struct AccessToken {
    value: SecretString,
}

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: SecretString::from(value.into()),
        }
    }

    /// Load from an environment variable, if set.
    pub fn from_env(env_var: &str) -> Option<Self> {
        std::env::var(env_var).ok().map(Self::new)
    }

    /// Expose the raw token. Call only when building the request header.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Backend abstraction allows swapping completion services.
///
/// This is the ONLY place network calls to the model are made; the
/// orchestrator and parser never touch the wire.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Execute a chat completion.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, BackendError>;

    /// Check if the backend is reachable.
    async fn health_check(&self) -> bool;

    /// Backend name for logs and metrics.
    fn name(&self) -> &str;
}
