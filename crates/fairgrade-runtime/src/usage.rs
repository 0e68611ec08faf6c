//! Accumulated backend usage for observability.

use parking_lot::RwLock;
use serde::Serialize;

use crate::backends::TokenUsage;

/// Usage totals since construction (or the last reset).
#[derive(Debug, Clone, Default, Serialize)]
pub struct BackendUsage {
    /// Completed backend calls
    pub calls: u32,

    /// Transient-failure retries performed
    pub retries: u32,

    /// Cache hits that skipped the backend entirely
    pub cache_hits: u32,

    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl BackendUsage {
    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Thread-safe usage accumulator shared across concurrent evaluations.
#[derive(Default)]
pub struct UsageLog {
    inner: RwLock<BackendUsage>,
}

impl UsageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed backend call.
    pub fn record_call(&self, usage: &TokenUsage) {
        let mut inner = self.inner.write();
        inner.calls += 1;
        inner.prompt_tokens += usage.prompt_tokens;
        inner.completion_tokens += usage.completion_tokens;
    }

    pub fn record_retry(&self) {
        self.inner.write().retries += 1;
    }

    pub fn record_cache_hit(&self) {
        self.inner.write().cache_hits += 1;
    }

    /// Snapshot of current totals.
    pub fn snapshot(&self) -> BackendUsage {
        self.inner.read().clone()
    }

    pub fn reset(&self) {
        *self.inner.write() = BackendUsage::default();
    }
}
