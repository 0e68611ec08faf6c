//! Ollama-compatible backend for local models.
//!
//! Talks to the `/api/chat` endpoint of an Ollama server with streaming
//! disabled: grading is not latency-critical at sub-second scale, so the
//! full completion is fetched in one response.

use super::{
    factory::BackendFactory, AccessToken, BackendError, ChatMessage, CompletionBackend,
    CompletionConfig, CompletionResponse, TokenUsage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable holding an optional bearer token for deployments
/// behind an authenticating proxy.
pub const BACKEND_TOKEN_ENV: &str = "FAIRGRADE_BACKEND_TOKEN";

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:11434";

/// Ollama-compatible completion backend.
pub struct OllamaBackend {
    endpoint: String,
    token: Option<AccessToken>,
}

impl std::fmt::Debug for OllamaBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaBackend")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token)
            .finish()
    }
}

impl OllamaBackend {
    /// Create a backend for the given server endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Attach a bearer token for authenticated deployments.
    pub fn with_token(mut self, token: AccessToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Create from JSON configuration.
    ///
    /// Recognized keys: `endpoint` (defaults to the local Ollama port),
    /// `token` (falls back to the `FAIRGRADE_BACKEND_TOKEN` environment
    /// variable; absent means unauthenticated).
    pub fn from_config(config: &JsonValue) -> Result<Self, BackendError> {
        let endpoint = config["endpoint"].as_str().unwrap_or(DEFAULT_ENDPOINT);

        let token = config["token"]
            .as_str()
            .map(AccessToken::new)
            .or_else(|| AccessToken::from_env(BACKEND_TOKEN_ENV));

        let mut backend = Self::new(endpoint);
        backend.token = token;
        Ok(backend)
    }

    fn get_client(&self) -> &reqwest::Client {
        static CLIENT: std::sync::OnceLock<reqwest::Client> = std::sync::OnceLock::new();
        CLIENT.get_or_init(|| {
            reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .build()
                .expect("failed to build HTTP client")
        })
    }
}

/// Ollama chat request format.
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama chat response format (non-streaming).
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    model: String,
    message: OllamaResponseMessage,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaErrorBody {
    error: String,
}

#[async_trait]
impl CompletionBackend for OllamaBackend {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, BackendError> {
        let request = OllamaChatRequest {
            model: &config.model,
            messages: &messages,
            stream: false,
            options: OllamaOptions {
                temperature: config.temperature,
                num_predict: config.max_tokens,
            },
        };

        let mut builder = self
            .get_client()
            .post(format!("{}/api/chat", self.endpoint))
            .timeout(config.timeout)
            .json(&request);

        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token.expose());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout(config.timeout)
            } else if e.is_connect() {
                BackendError::Unreachable(e.to_string())
            } else {
                BackendError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OllamaErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            return Err(BackendError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::DecodeError(e.to_string()))?;

        Ok(CompletionResponse {
            content: body.message.content,
            usage: TokenUsage {
                prompt_tokens: body.prompt_eval_count,
                completion_tokens: body.eval_count,
            },
            model: if body.model.is_empty() {
                config.model.clone()
            } else {
                body.model
            },
        })
    }

    async fn health_check(&self) -> bool {
        self.get_client()
            .get(format!("{}/api/tags", self.endpoint))
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Factory for creating Ollama backends from configuration.
///
/// ## Configuration Format
/// ```json
/// {
///   "endpoint": "http://127.0.0.1:11434",  // Optional
///   "token": "..."                          // Optional, falls back to FAIRGRADE_BACKEND_TOKEN env
/// }
/// ```
pub struct OllamaBackendFactory;

impl BackendFactory for OllamaBackendFactory {
    fn backend_type(&self) -> &'static str {
        "ollama"
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn CompletionBackend>, BackendError> {
        let backend = OllamaBackend::from_config(config)?;
        Ok(Arc::new(backend))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), BackendError> {
        if let Some(url) = config["endpoint"].as_str() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(BackendError::NotConfigured(
                    "endpoint must start with http:// or https://".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn default_config(&self) -> JsonValue {
        serde_json::json!({
            "endpoint": DEFAULT_ENDPOINT
        })
    }

    fn description(&self) -> &'static str {
        "Ollama-compatible local model backend"
    }
}
