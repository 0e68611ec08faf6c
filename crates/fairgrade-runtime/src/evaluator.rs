//! Evaluation orchestrator.
//!
//! One call composes the whole engine: empty-answer short-circuit →
//! prompt builder → backend client → response parser. Concurrency is
//! bounded by a semaphore sized for the backend: a single local model
//! instance serializes requests, so excess callers queue (or are
//! rejected, when configured) instead of piling onto the model.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Semaphore, SemaphorePermit};

use fairgrade_core::bank::{BankError, QuestionBank};
use fairgrade_core::types::{EvaluationError, EvaluationRequest, EvaluationResult, Rubric};
use fairgrade_core::{parser, prompt};

use crate::backends::{BackendError, CompletionBackend};
use crate::cache::{CacheKey, EvaluationCache};
use crate::client::BackendClient;
use crate::config::EvaluatorConfig;
use crate::usage::{BackendUsage, UsageLog};

/// Errors from bank-resolved grading: either the question lookup failed
/// or the evaluation itself did. Kept distinct so a missing question is
/// never reported as a grading failure.
#[derive(Error, Debug)]
pub enum GradeError {
    #[error(transparent)]
    Bank(#[from] BankError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

/// The evaluation orchestrator.
pub struct Evaluator {
    client: BackendClient,
    semaphore: Semaphore,
    cache: Option<EvaluationCache>,
    reject_when_busy: bool,
    usage: Arc<UsageLog>,
}

impl Evaluator {
    pub fn new(backend: Arc<dyn CompletionBackend>, config: EvaluatorConfig) -> Self {
        let usage = Arc::new(UsageLog::new());
        let client = BackendClient::new(backend, &config, Arc::clone(&usage));
        let cache = config
            .cache
            .enabled
            .then(|| EvaluationCache::from_config(&config.cache));

        Self {
            client,
            semaphore: Semaphore::new(config.max_concurrency.max(1)),
            cache,
            reject_when_busy: config.reject_when_busy,
            usage,
        }
    }

    /// Evaluate one answer against one question's rubric.
    ///
    /// An empty or whitespace-only answer short-circuits to a zero-score
    /// result without touching the backend. All other paths go through
    /// the backend once; client and parser errors propagate unchanged.
    pub async fn evaluate(
        &self,
        question: &str,
        rubric: &Rubric,
        answer: &str,
    ) -> Result<EvaluationResult, EvaluationError> {
        if answer.trim().is_empty() {
            tracing::debug!("empty answer, short-circuiting without a backend call");
            return Ok(EvaluationResult::no_answer(rubric));
        }

        let request = EvaluationRequest::new(question, rubric.clone(), answer);

        let key = CacheKey::new(&request.question_text, &request.rubric, &request.answer_text);
        if let Some(cache) = &self.cache {
            if let Some(result) = cache.get(&key).await {
                tracing::debug!("cache hit, skipping backend call");
                self.usage.record_cache_hit();
                return Ok(result);
            }
        }

        let _permit = self.acquire_slot().await?;

        let rendered = prompt::build(
            &request.question_text,
            &request.rubric,
            &request.answer_text,
        );
        let raw = self.client.send(&rendered).await?;
        let result = parser::parse(&raw, &request.rubric)?;

        if let Some(cache) = &self.cache {
            cache.insert(key, result.clone()).await;
        }

        Ok(result)
    }

    /// Evaluate an answer to a bank question, resolved by id.
    pub async fn evaluate_question_id(
        &self,
        bank: &QuestionBank,
        question_id: &str,
        answer: &str,
    ) -> Result<EvaluationResult, GradeError> {
        let question = bank.get(question_id)?;
        self.evaluate(&question.text, &question.rubric, answer)
            .await
            .map_err(GradeError::from)
    }

    async fn acquire_slot(&self) -> Result<SemaphorePermit<'_>, EvaluationError> {
        if self.reject_when_busy {
            self.semaphore
                .try_acquire()
                .map_err(|_| EvaluationError::BackendUnavailable {
                    detail: "all evaluation slots are busy".to_string(),
                })
        } else {
            self.semaphore
                .acquire()
                .await
                .map_err(|_| EvaluationError::BackendUnavailable {
                    detail: "evaluator is shut down".to_string(),
                })
        }
    }

    /// Backend usage totals for this evaluator.
    pub fn usage(&self) -> BackendUsage {
        self.usage.snapshot()
    }

    /// Check whether the backend is reachable.
    pub async fn health_check(&self) -> bool {
        self.client.health_check().await
    }
}

/// Builder for [`Evaluator`].
pub struct EvaluatorBuilder {
    backend: Option<Arc<dyn CompletionBackend>>,
    config: EvaluatorConfig,
}

impl EvaluatorBuilder {
    pub fn new() -> Self {
        Self {
            backend: None,
            config: EvaluatorConfig::default(),
        }
    }

    pub fn backend(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn config(mut self, config: EvaluatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Evaluator, BackendError> {
        let backend = self
            .backend
            .ok_or_else(|| BackendError::NotConfigured("no backend set".to_string()))?;
        Ok(Evaluator::new(backend, self.config))
    }
}

impl Default for EvaluatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
