//! Result cache: skip the backend for repeated identical evaluations.
//!
//! Candidates practicing against a fixed bank resubmit identical answers
//! surprisingly often; a hit saves a full local-model inference. Only
//! fully validated results are stored, so the cache can never serve
//! anything the parser would have rejected.

use moka::future::Cache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use fairgrade_core::types::{EvaluationResult, Rubric};

use crate::config::CacheConfig;

/// Cache key over the full evaluation input triple.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    question_hash: u64,
    rubric_hash: u64,
    answer_hash: u64,
}

impl CacheKey {
    pub fn new(question: &str, rubric: &Rubric, answer: &str) -> Self {
        Self {
            question_hash: hash_str(question),
            rubric_hash: hash_rubric(rubric),
            answer_hash: hash_str(answer),
        }
    }
}

/// Evaluation cache using moka.
pub struct EvaluationCache {
    cache: Cache<CacheKey, EvaluationResult>,
}

impl EvaluationCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, config.ttl)
    }

    pub async fn get(&self, key: &CacheKey) -> Option<EvaluationResult> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: CacheKey, result: EvaluationResult) {
        self.cache.insert(key, result).await;
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

// Hash helpers

fn hash_str(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

fn hash_rubric(rubric: &Rubric) -> u64 {
    let mut hasher = DefaultHasher::new();
    for criterion in &rubric.criteria {
        criterion.id.hash(&mut hasher);
        criterion.description.hash(&mut hasher);
        criterion.weight.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairgrade_core::types::Criterion;

    fn rubric() -> Rubric {
        Rubric::new(vec![Criterion {
            id: "C1".to_string(),
            description: "Covers the key concept".to_string(),
            weight: 10.0,
        }])
        .unwrap()
    }

    #[tokio::test]
    async fn test_cache_miss_then_hit() {
        let cache = EvaluationCache::new(100, Duration::from_secs(60));
        let key = CacheKey::new("Q", &rubric(), "my answer");

        assert!(cache.get(&key).await.is_none());

        let result = EvaluationResult::no_answer(&rubric());
        cache.insert(key.clone(), result.clone()).await;

        let cached = cache.get(&key).await;
        assert!(cached.is_some());
        assert_eq!(cached.unwrap().max_score, 10.0);
    }

    #[test]
    fn test_key_distinguishes_inputs() {
        let r = rubric();
        let base = CacheKey::new("Q", &r, "answer");

        assert_ne!(base, CacheKey::new("Q2", &r, "answer"));
        assert_ne!(base, CacheKey::new("Q", &r, "different answer"));

        let other_rubric = Rubric::new(vec![Criterion {
            id: "C1".to_string(),
            description: "Covers the key concept".to_string(),
            weight: 5.0,
        }])
        .unwrap();
        assert_ne!(base, CacheKey::new("Q", &other_rubric, "answer"));
    }
}
