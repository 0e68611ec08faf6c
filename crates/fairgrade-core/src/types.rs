//! Core data model for rubric-grounded evaluation.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One rubric line item: an identifier, what the candidate should have
/// covered, and how many points it is worth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Criterion {
    /// Unique identifier within the rubric (e.g., "C1", "gain-formula")
    pub id: String,

    /// What a correct answer covers for this point
    pub description: String,

    /// Points awarded when the criterion is met
    pub weight: f64,
}

/// Errors from rubric validation.
#[derive(Error, Debug)]
pub enum RubricError {
    #[error("rubric has no criteria")]
    Empty,

    #[error("duplicate criterion id: {0}")]
    DuplicateId(String),

    #[error("criterion {id} has invalid weight {weight}")]
    InvalidWeight { id: String, weight: f64 },
}

/// A weighted list of criteria used to score one question's answer.
///
/// The rubric is the only authority on the scoring ceiling: `max_score`
/// is always the sum of criterion weights, regardless of what the
/// backend's text claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rubric {
    pub criteria: Vec<Criterion>,
}

impl Rubric {
    /// Create a validated rubric.
    pub fn new(criteria: Vec<Criterion>) -> Result<Self, RubricError> {
        let rubric = Self { criteria };
        rubric.validate()?;
        Ok(rubric)
    }

    /// Validate structure: non-empty, unique ids, positive finite weights.
    pub fn validate(&self) -> Result<(), RubricError> {
        if self.criteria.is_empty() {
            return Err(RubricError::Empty);
        }

        let mut seen = std::collections::HashSet::new();
        for criterion in &self.criteria {
            if !seen.insert(criterion.id.as_str()) {
                return Err(RubricError::DuplicateId(criterion.id.clone()));
            }
            if !criterion.weight.is_finite() || criterion.weight <= 0.0 {
                return Err(RubricError::InvalidWeight {
                    id: criterion.id.clone(),
                    weight: criterion.weight,
                });
            }
        }

        Ok(())
    }

    /// The scoring ceiling: sum of all criterion weights.
    pub fn max_score(&self) -> f64 {
        self.criteria.iter().map(|c| c.weight).sum()
    }

    /// Criterion ids in rubric order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.criteria.iter().map(|c| c.id.as_str())
    }
}

/// Immutable value holding everything one evaluation needs.
///
/// Constructed once per evaluation and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRequest {
    pub question_text: String,
    pub rubric: Rubric,
    pub answer_text: String,
}

impl EvaluationRequest {
    pub fn new(
        question_text: impl Into<String>,
        rubric: Rubric,
        answer_text: impl Into<String>,
    ) -> Self {
        Self {
            question_text: question_text.into(),
            rubric,
            answer_text: answer_text.into(),
        }
    }
}

/// Verdict for a single rubric criterion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CriterionOutcome {
    /// Whether the answer covered this criterion
    pub met: bool,

    /// One-sentence explanation of the verdict
    pub justification: String,
}

/// A complete, validated scoring record for one answer.
///
/// Invariants (enforced by the parser, never assumed):
/// - `0 <= total_score <= max_score`
/// - `criterion_outcomes` keys exactly equal the rubric's criterion ids
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationResult {
    pub total_score: f64,

    /// Recomputed from the rubric's weights, never from backend text
    pub max_score: f64,

    /// Per-criterion verdicts, keyed by criterion id (BTreeMap for
    /// deterministic ordering)
    pub criterion_outcomes: BTreeMap<String, CriterionOutcome>,

    /// Natural-language summary of the grading
    pub overall_explanation: String,

    pub evaluated_at: DateTime<Utc>,
}

impl EvaluationResult {
    /// The canonical result for an empty or whitespace-only answer:
    /// zero points, every criterion not met, no backend involved.
    pub fn no_answer(rubric: &Rubric) -> Self {
        let criterion_outcomes = rubric
            .criteria
            .iter()
            .map(|c| {
                (
                    c.id.clone(),
                    CriterionOutcome {
                        met: false,
                        justification: "no answer provided".to_string(),
                    },
                )
            })
            .collect();

        Self {
            total_score: 0.0,
            max_score: rubric.max_score(),
            criterion_outcomes,
            overall_explanation: "No answer was provided, so every rubric point is marked as not met."
                .to_string(),
            evaluated_at: Utc::now(),
        }
    }
}

/// Errors surfaced to the caller of an evaluation.
///
/// `EmptyAnswer` exists for completeness of the taxonomy; the
/// orchestrator handles empty answers without error, so callers of
/// `evaluate` never observe it.
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("backend did not respond within {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("backend unavailable: {detail}")]
    BackendUnavailable { detail: String },

    #[error("malformed backend response: {detail}")]
    MalformedResponse { detail: String },

    #[error("no answer provided")]
    EmptyAnswer,
}

impl EvaluationError {
    pub fn kind(&self) -> EvaluationErrorKind {
        match self {
            Self::Timeout { .. } => EvaluationErrorKind::Timeout,
            Self::BackendUnavailable { .. } => EvaluationErrorKind::BackendUnavailable,
            Self::MalformedResponse { .. } => EvaluationErrorKind::MalformedResponse,
            Self::EmptyAnswer => EvaluationErrorKind::EmptyAnswer,
        }
    }
}

/// Error kind, for mapping to transport-level statuses outside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationErrorKind {
    Timeout,
    BackendUnavailable,
    MalformedResponse,
    EmptyAnswer,
}

impl EvaluationErrorKind {
    /// The HTTP status an API layer should map this kind to.
    pub fn http_status(self) -> u16 {
        match self {
            Self::Timeout => 504,
            Self::BackendUnavailable => 503,
            Self::MalformedResponse => 502,
            Self::EmptyAnswer => 422,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rubric(weights: &[f64]) -> Rubric {
        Rubric::new(
            weights
                .iter()
                .enumerate()
                .map(|(i, w)| Criterion {
                    id: format!("C{}", i + 1),
                    description: format!("Criterion {}", i + 1),
                    weight: *w,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_max_score_is_sum_of_weights() {
        let r = rubric(&[3.0, 4.0, 3.0]);
        assert_eq!(r.max_score(), 10.0);
    }

    #[test]
    fn test_empty_rubric_rejected() {
        assert!(matches!(Rubric::new(vec![]), Err(RubricError::Empty)));
    }

    #[test]
    fn test_duplicate_criterion_ids_rejected() {
        let result = Rubric::new(vec![
            Criterion {
                id: "C1".to_string(),
                description: "first".to_string(),
                weight: 5.0,
            },
            Criterion {
                id: "C1".to_string(),
                description: "second".to_string(),
                weight: 5.0,
            },
        ]);
        assert!(matches!(result, Err(RubricError::DuplicateId(id)) if id == "C1"));
    }

    #[test]
    fn test_nonpositive_weight_rejected() {
        let result = Rubric::new(vec![Criterion {
            id: "C1".to_string(),
            description: "first".to_string(),
            weight: 0.0,
        }]);
        assert!(matches!(result, Err(RubricError::InvalidWeight { .. })));
    }

    #[test]
    fn test_no_answer_result_invariants() {
        let r = rubric(&[4.0, 6.0]);
        let result = EvaluationResult::no_answer(&r);

        assert_eq!(result.total_score, 0.0);
        assert_eq!(result.max_score, 10.0);
        assert_eq!(result.criterion_outcomes.len(), 2);
        assert!(result.criterion_outcomes.values().all(|o| !o.met));
        assert!(result
            .criterion_outcomes
            .values()
            .all(|o| o.justification == "no answer provided"));
    }

    #[test]
    fn test_error_kind_http_mapping() {
        assert_eq!(EvaluationErrorKind::Timeout.http_status(), 504);
        assert_eq!(EvaluationErrorKind::BackendUnavailable.http_status(), 503);
        assert_eq!(EvaluationErrorKind::MalformedResponse.http_status(), 502);
    }

    #[test]
    fn test_error_kind_accessor() {
        let err = EvaluationError::MalformedResponse {
            detail: "garbage".to_string(),
        };
        assert_eq!(err.kind(), EvaluationErrorKind::MalformedResponse);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn max_score_always_equals_weight_sum(
                weights in prop::collection::vec(0.1f64..100.0, 1..12)
            ) {
                let r = rubric(&weights);
                let expected: f64 = weights.iter().sum();
                prop_assert!((r.max_score() - expected).abs() < 1e-9);
            }

            #[test]
            fn no_answer_outcomes_match_rubric_ids(
                weights in prop::collection::vec(0.1f64..100.0, 1..12)
            ) {
                let r = rubric(&weights);
                let result = EvaluationResult::no_answer(&r);
                let expected: Vec<&str> = r.ids().collect();
                let mut actual: Vec<&str> =
                    result.criterion_outcomes.keys().map(|s| s.as_str()).collect();
                actual.sort_unstable();
                let mut expected_sorted = expected.clone();
                expected_sorted.sort_unstable();
                prop_assert_eq!(actual, expected_sorted);
            }
        }
    }
}
