//! Runtime configuration.
//!
//! Configuration is an explicit value object handed to the evaluator at
//! construction time, never ambient global state; evaluations stay
//! independently testable with mock backends. Durations in config files
//! are human-readable strings ("30s", "250ms", "1h").

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::backends::CompletionConfig;

/// Configuration for the evaluation orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Model served by the backend
    #[serde(default = "defaults::model")]
    pub model: String,

    /// Maximum tokens the backend may generate per evaluation
    #[serde(default = "defaults::max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature (0.0 keeps grading as repeatable as the model allows)
    #[serde(default)]
    pub temperature: f32,

    /// Overall wall-clock bound for one backend call, retries included
    #[serde(default = "defaults::timeout", with = "duration_str")]
    pub timeout: Duration,

    /// Backoff before the single retry of a transient connection failure
    #[serde(default = "defaults::retry_backoff", with = "duration_str")]
    pub retry_backoff: Duration,

    /// Concurrent evaluations allowed in flight. A single local model
    /// instance serializes requests anyway, so the default is 1.
    #[serde(default = "defaults::max_concurrency")]
    pub max_concurrency: usize,

    /// Reject excess concurrent evaluations instead of queueing them
    #[serde(default)]
    pub reject_when_busy: bool,

    /// Result cache settings
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            model: defaults::model(),
            max_tokens: defaults::max_tokens(),
            temperature: 0.0,
            timeout: defaults::timeout(),
            retry_backoff: defaults::retry_backoff(),
            max_concurrency: defaults::max_concurrency(),
            reject_when_busy: false,
            cache: CacheConfig::default(),
        }
    }
}

impl EvaluatorConfig {
    /// Per-request completion settings derived from this config.
    pub fn completion_config(&self) -> CompletionConfig {
        CompletionConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout,
        }
    }
}

/// Result cache settings. Disabled unless turned on explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "defaults::cache_max_entries")]
    pub max_entries: u64,

    #[serde(default = "defaults::cache_ttl", with = "duration_str")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: defaults::cache_max_entries(),
            ttl: defaults::cache_ttl(),
        }
    }
}

mod defaults {
    use std::time::Duration;

    pub fn model() -> String {
        "phi3".to_string()
    }

    pub fn max_tokens() -> u32 {
        1024
    }

    pub fn timeout() -> Duration {
        Duration::from_secs(30)
    }

    pub fn retry_backoff() -> Duration {
        Duration::from_millis(250)
    }

    pub fn max_concurrency() -> usize {
        1
    }

    pub fn cache_max_entries() -> u64 {
        10_000
    }

    pub fn cache_ttl() -> Duration {
        Duration::from_secs(3600)
    }
}

mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}
