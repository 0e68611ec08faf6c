//! Response parser: raw backend text in, validated scoring record out.
//!
//! Parsing is two-tiered:
//! 1. Strict: locate the contracted JSON block, validate it against the
//!    embedded schema, deserialize.
//! 2. Tolerant: if no structurally valid block exists, scan the text for
//!    per-criterion met/not-met markers and a numeric score.
//!
//! Semantic violations inside a structurally valid block (missing or
//! unknown criterion ids, a met verdict without justification, a score
//! outside the rubric's ceiling) are terminal: falling back could launder
//! a contract violation into an accepted result.
//!
//! The rubric, not the backend, owns `max_score`. Out-of-range scores are
//! rejected, never clamped.

use std::collections::BTreeMap;

use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::schema;
use crate::types::{CriterionOutcome, EvaluationError, EvaluationResult, Rubric};

/// Upper bound on raw text carried inside error details.
const SNIPPET_CHARS: usize = 400;

lazy_static! {
    /// Markdown-fenced JSON block, e.g. ```json { ... } ```
    static ref FENCED_JSON: Regex =
        Regex::new(r"(?s)```(?:json)?\s*(\{.*\})\s*```").unwrap();

    /// Labeled score, e.g. "total_score": 7 or "Score: 7.5"
    static ref SCORE_LABEL: Regex =
        Regex::new(r"(?i)\b(?:total[\s_-]*score|score|total)\b[^0-9\-\n]*(-?\d+(?:\.\d+)?)").unwrap();

    /// Fractional score, e.g. "7/10"
    static ref SCORE_FRACTION: Regex =
        Regex::new(r"(-?\d+(?:\.\d+)?)\s*/\s*\d+(?:\.\d+)?").unwrap();

    /// Negative verdict markers. Checked before MET: "not met" contains "met".
    static ref NOT_MET: Regex =
        Regex::new(r"(?i)\b(?:not\s+met|unmet|not\s+satisfied|not\s+covered|missed|missing|failed|false|no)\b").unwrap();

    /// Positive verdict markers.
    static ref MET: Regex =
        Regex::new(r"(?i)\b(?:met|satisfied|covered|yes|pass(?:ed)?|true)\b").unwrap();

    /// Overall explanation label in loose text.
    static ref EXPLANATION_LABEL: Regex =
        Regex::new(r#"(?i)\b(?:explanation|summary)\b["':\s]*(?P<text>[^"\n]+)"#).unwrap();
}

/// The contracted response block, as deserialized from the strict tier.
#[derive(Debug, Deserialize)]
struct RawEvaluation {
    criteria: Vec<RawCriterion>,
    total_score: f64,
    explanation: String,
}

#[derive(Debug, Deserialize)]
struct RawCriterion {
    id: String,
    met: bool,
    justification: String,
}

/// Extract a structured evaluation from raw backend text.
///
/// Fails with [`EvaluationError::MalformedResponse`] when the text cannot
/// be reduced to a result satisfying every invariant; the error detail
/// carries a truncated copy of the offending text for diagnosis.
pub fn parse(raw: &str, rubric: &Rubric) -> Result<EvaluationResult, EvaluationError> {
    if let Some(json_text) = extract_json(raw) {
        match decode_contracted_block(&json_text) {
            Ok(block) => {
                let entries = block
                    .criteria
                    .into_iter()
                    .map(|c| (c.id, c.met, c.justification))
                    .collect();
                return finish(entries, block.total_score, block.explanation, rubric, raw);
            }
            Err(reason) => {
                tracing::debug!(reason = %reason, "contracted block rejected, trying tolerant extraction");
            }
        }
    }

    let (entries, total_score, explanation) =
        parse_tolerant(raw, rubric).map_err(|reason| malformed(&reason, raw))?;
    finish(entries, total_score, explanation, rubric, raw)
}

/// Locate candidate JSON in the raw text: fenced block first, then the
/// outermost brace span.
fn extract_json(raw: &str) -> Option<String> {
    if let Some(captures) = FENCED_JSON.captures(raw) {
        return Some(captures[1].to_string());
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if start < end {
        Some(raw[start..=end].to_string())
    } else {
        None
    }
}

/// Strict tier: schema-validate and deserialize a candidate block.
fn decode_contracted_block(json_text: &str) -> Result<RawEvaluation, String> {
    let value: serde_json::Value =
        serde_json::from_str(json_text).map_err(|e| format!("invalid JSON: {}", e))?;

    schema::validate_evaluation(&value)
        .map_err(|errors| format!("schema violations: {}", errors.join("; ")))?;

    serde_json::from_value(value).map_err(|e| format!("unexpected shape: {}", e))
}

/// Tolerant tier: recover verdicts and score from loosely formatted text.
fn parse_tolerant(
    raw: &str,
    rubric: &Rubric,
) -> Result<(Vec<(String, bool, String)>, f64, String), String> {
    let mut entries = Vec::with_capacity(rubric.criteria.len());

    for criterion in &rubric.criteria {
        let id_pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&criterion.id)))
            .map_err(|e| format!("criterion id '{}' is not scannable: {}", criterion.id, e))?;

        let line = raw
            .lines()
            .find(|line| id_pattern.is_match(line))
            .ok_or_else(|| format!("no marker found for criterion '{}'", criterion.id))?;

        let met = if NOT_MET.is_match(line) {
            false
        } else if MET.is_match(line) {
            true
        } else {
            return Err(format!(
                "criterion '{}' mentioned without a met/not-met marker",
                criterion.id
            ));
        };

        entries.push((criterion.id.clone(), met, line.trim().to_string()));
    }

    let total_score = extract_score(raw).ok_or("no numeric score found")?;

    let explanation = EXPLANATION_LABEL
        .captures(raw)
        .map(|c| c["text"].trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Score recovered from loosely formatted grader output.".to_string());

    Ok((entries, total_score, explanation))
}

fn extract_score(raw: &str) -> Option<f64> {
    if let Some(captures) = SCORE_LABEL.captures(raw) {
        if let Ok(score) = captures[1].parse::<f64>() {
            return Some(score);
        }
    }
    if let Some(captures) = SCORE_FRACTION.captures(raw) {
        if let Ok(score) = captures[1].parse::<f64>() {
            return Some(score);
        }
    }
    None
}

/// Assemble and validate the final result. Every invariant the record
/// promises is enforced here, for both tiers.
fn finish(
    entries: Vec<(String, bool, String)>,
    total_score: f64,
    explanation: String,
    rubric: &Rubric,
    raw: &str,
) -> Result<EvaluationResult, EvaluationError> {
    let mut criterion_outcomes = BTreeMap::new();

    for (id, met, justification) in entries {
        if !rubric.ids().any(|known| known == id) {
            return Err(malformed(&format!("unknown criterion id '{}'", id), raw));
        }
        let outcome = CriterionOutcome {
            met,
            justification: justification.trim().to_string(),
        };
        if criterion_outcomes.insert(id.clone(), outcome).is_some() {
            return Err(malformed(&format!("duplicate criterion id '{}'", id), raw));
        }
    }

    for id in rubric.ids() {
        if !criterion_outcomes.contains_key(id) {
            return Err(malformed(
                &format!("response is missing criterion '{}'", id),
                raw,
            ));
        }
    }

    for (id, outcome) in &criterion_outcomes {
        if outcome.met && outcome.justification.is_empty() {
            return Err(malformed(
                &format!("criterion '{}' marked met without justification", id),
                raw,
            ));
        }
    }

    let max_score = rubric.max_score();
    if !total_score.is_finite() || total_score < 0.0 || total_score > max_score {
        return Err(malformed(
            &format!(
                "claimed total score {} is outside the rubric ceiling [0, {}]",
                total_score, max_score
            ),
            raw,
        ));
    }

    Ok(EvaluationResult {
        total_score,
        max_score,
        criterion_outcomes,
        overall_explanation: explanation,
        evaluated_at: Utc::now(),
    })
}

fn malformed(reason: &str, raw: &str) -> EvaluationError {
    EvaluationError::MalformedResponse {
        detail: format!("{}; raw response (truncated): {}", reason, snippet(raw)),
    }
}

/// Char-boundary-safe truncation for diagnostics.
fn snippet(raw: &str) -> String {
    let mut out: String = raw.chars().take(SNIPPET_CHARS).collect();
    if raw.chars().count() > SNIPPET_CHARS {
        out.push('…');
    }
    out
}
