//! # fairgrade-runtime
//!
//! Async evaluation runtime for FairGrade.
//!
//! `fairgrade-core` is fully deterministic and never talks to a model;
//! this crate supplies everything around it that does:
//! - The [`CompletionBackend`] trait and the Ollama-compatible
//!   implementation for local models
//! - The [`BackendClient`], which owns the timeout bound and the
//!   retry-once policy for transient connection failures
//! - The [`Evaluator`] orchestrator: bank → prompt → backend → parser,
//!   with bounded concurrency and an optional result cache
//! - The [`HintAssistant`] helper chat served by the same backend
//!
//! ## Example
//!
//! ```rust,ignore
//! use fairgrade_runtime::{Evaluator, EvaluatorConfig, OllamaBackend};
//! use std::sync::Arc;
//!
//! let backend = Arc::new(OllamaBackend::new("http://127.0.0.1:11434"));
//! let evaluator = Evaluator::new(backend, EvaluatorConfig::default());
//!
//! let result = evaluator.evaluate(&question.text, &question.rubric, answer).await?;
//! println!("{}/{}", result.total_score, result.max_score);
//! ```

pub mod assistant;
pub mod backends;
pub mod cache;
pub mod client;
pub mod config;
pub mod evaluator;
pub mod usage;

// Re-export main types at crate root
pub use assistant::HintAssistant;
pub use backends::{
    AccessToken, BackendError, BackendFactory, BackendRegistry, ChatMessage, CompletionBackend,
    CompletionConfig, CompletionResponse, TokenUsage,
};
pub use cache::EvaluationCache;
pub use client::BackendClient;
pub use config::{CacheConfig, EvaluatorConfig};
pub use evaluator::{Evaluator, EvaluatorBuilder, GradeError};
pub use usage::{BackendUsage, UsageLog};

#[cfg(feature = "ollama")]
pub use backends::{OllamaBackend, OllamaBackendFactory};
