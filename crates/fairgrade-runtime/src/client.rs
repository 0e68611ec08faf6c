//! Backend client: timeout bounding and retry policy for one call.
//!
//! The client owns exactly two behaviors on top of the raw backend:
//! - Transient connection failures are retried once with a short constant
//!   backoff, then surfaced as `BackendUnavailable`.
//! - The whole call (retry included) is bounded by a wall-clock timeout;
//!   exceeding it cancels the in-flight request and surfaces `Timeout`.
//!
//! Garbled response CONTENT is never retried here. The backend is a
//! non-deterministic generator; retrying it on a malformed output could
//! silently produce a different, equally malformed result. Content-level
//! failures belong to the parser.

use std::sync::Arc;
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};

use fairgrade_core::prompt::RenderedPrompt;
use fairgrade_core::types::EvaluationError;

use crate::backends::{BackendError, ChatMessage, CompletionBackend, CompletionConfig};
use crate::config::EvaluatorConfig;
use crate::usage::UsageLog;

/// Client wrapper around a completion backend.
pub struct BackendClient {
    backend: Arc<dyn CompletionBackend>,
    completion: CompletionConfig,
    timeout: Duration,
    retry_backoff: Duration,
    usage: Arc<UsageLog>,
}

impl BackendClient {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        config: &EvaluatorConfig,
        usage: Arc<UsageLog>,
    ) -> Self {
        Self {
            backend,
            completion: config.completion_config(),
            timeout: config.timeout,
            retry_backoff: config.retry_backoff,
            usage,
        }
    }

    /// Send a rendered evaluation prompt and return the raw completion text.
    pub async fn send(&self, prompt: &RenderedPrompt) -> Result<String, EvaluationError> {
        let messages = vec![
            ChatMessage::system(&prompt.system),
            ChatMessage::user(&prompt.user),
        ];
        self.send_messages(messages).await
    }

    /// Send arbitrary chat messages under the same timeout and retry policy.
    pub async fn send_messages(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<String, EvaluationError> {
        let attempt = || {
            let messages = messages.clone();
            async move { self.backend.complete(messages, &self.completion).await }
        };

        let retried = attempt
            .retry(
                ConstantBuilder::default()
                    .with_delay(self.retry_backoff)
                    .with_max_times(1),
            )
            .when(|e: &BackendError| e.is_transient())
            .notify(|err: &BackendError, backoff: Duration| {
                tracing::warn!(
                    backend = self.backend.name(),
                    error = %err,
                    backoff = ?backoff,
                    "transient backend failure, retrying once"
                );
                self.usage.record_retry();
            });

        match tokio::time::timeout(self.timeout, retried).await {
            Ok(Ok(response)) => {
                self.usage.record_call(&response.usage);
                tracing::debug!(
                    backend = self.backend.name(),
                    model = %response.model,
                    tokens = response.usage.total(),
                    "backend call complete"
                );
                Ok(response.content)
            }
            Ok(Err(BackendError::Timeout(timeout))) => Err(EvaluationError::Timeout { timeout }),
            Ok(Err(err)) => Err(EvaluationError::BackendUnavailable {
                detail: err.to_string(),
            }),
            Err(_) => Err(EvaluationError::Timeout {
                timeout: self.timeout,
            }),
        }
    }

    pub async fn health_check(&self) -> bool {
        self.backend.health_check().await
    }

    pub fn usage(&self) -> Arc<UsageLog> {
        Arc::clone(&self.usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{CompletionResponse, TokenUsage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Mock backend scripted to fail `failures` times before succeeding.
    struct FlakyBackend {
        calls: AtomicU32,
        failures: u32,
        error: fn() -> BackendError,
    }

    impl FlakyBackend {
        fn new(failures: u32, error: fn() -> BackendError) -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures,
                error,
            }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionBackend for FlakyBackend {
        async fn complete(
            &self,
            _messages: Vec<ChatMessage>,
            _config: &CompletionConfig,
        ) -> Result<CompletionResponse, BackendError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err((self.error)());
            }
            Ok(CompletionResponse {
                content: "raw completion".to_string(),
                usage: TokenUsage {
                    prompt_tokens: 100,
                    completion_tokens: 50,
                },
                model: "mock".to_string(),
            })
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    /// Mock backend that never responds within any reasonable bound.
    struct HangingBackend;

    #[async_trait]
    impl CompletionBackend for HangingBackend {
        async fn complete(
            &self,
            _messages: Vec<ChatMessage>,
            _config: &CompletionConfig,
        ) -> Result<CompletionResponse, BackendError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(CompletionResponse {
                content: "too late".to_string(),
                usage: TokenUsage::default(),
                model: "mock".to_string(),
            })
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "hanging"
        }
    }

    fn client_for(backend: Arc<dyn CompletionBackend>) -> BackendClient {
        let config = EvaluatorConfig {
            retry_backoff: Duration::from_millis(1),
            ..Default::default()
        };
        BackendClient::new(backend, &config, Arc::new(UsageLog::new()))
    }

    #[tokio::test]
    async fn test_transient_failure_retried_once_then_success() {
        let backend = Arc::new(FlakyBackend::new(1, || {
            BackendError::Unreachable("connection refused".to_string())
        }));
        let client = client_for(backend.clone());

        let result = client.send_messages(vec![ChatMessage::user("hi")]).await;

        assert!(result.is_ok());
        assert_eq!(backend.call_count(), 2);
        assert_eq!(client.usage().snapshot().retries, 1);
        assert_eq!(client.usage().snapshot().calls, 1);
    }

    #[tokio::test]
    async fn test_transient_failure_surfaces_after_single_retry() {
        let backend = Arc::new(FlakyBackend::new(u32::MAX, || {
            BackendError::Unreachable("connection refused".to_string())
        }));
        let client = client_for(backend.clone());

        let result = client.send_messages(vec![ChatMessage::user("hi")]).await;

        assert!(matches!(
            result,
            Err(EvaluationError::BackendUnavailable { .. })
        ));
        // One original attempt plus exactly one retry.
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_non_transient_failure_not_retried() {
        let backend = Arc::new(FlakyBackend::new(u32::MAX, || {
            BackendError::ApiError {
                status: 400,
                message: "bad request".to_string(),
            }
        }));
        let client = client_for(backend.clone());

        let result = client.send_messages(vec![ChatMessage::user("hi")]).await;

        assert!(matches!(
            result,
            Err(EvaluationError::BackendUnavailable { .. })
        ));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exceeding_the_bound_surfaces_timeout() {
        let client = client_for(Arc::new(HangingBackend));

        let result = client.send_messages(vec![ChatMessage::user("hi")]).await;

        match result {
            Err(EvaluationError::Timeout { timeout }) => {
                assert_eq!(timeout, Duration::from_secs(30));
            }
            other => panic!("expected Timeout, got {:?}", other.err().map(|e| e.kind())),
        }
    }

    #[tokio::test]
    async fn test_backend_timeout_maps_to_timeout_kind() {
        let backend = Arc::new(FlakyBackend::new(u32::MAX, || {
            BackendError::Timeout(Duration::from_secs(30))
        }));
        let client = client_for(backend);

        let result = client.send_messages(vec![ChatMessage::user("hi")]).await;
        assert!(matches!(result, Err(EvaluationError::Timeout { .. })));
    }
}
