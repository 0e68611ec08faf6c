//! JSON Schema validation for backend evaluation responses.
//!
//! The strict parsing tier validates the extracted JSON block against
//! spec/evaluation.schema.json before deserializing it, so shape errors
//! are reported as schema violations rather than serde noise.

use std::sync::OnceLock;
use thiserror::Error;

/// Embedded response schema (loaded at compile time).
const EVALUATION_SCHEMA_JSON: &str = include_str!("../../../spec/evaluation.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from schema validation.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("failed to load schema: {0}")]
    LoadError(String),
}

/// Get or initialize the compiled schema validator.
fn get_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = match serde_json::from_str(EVALUATION_SCHEMA_JSON) {
            Ok(v) => v,
            Err(e) => return Err(format!("invalid schema JSON: {}", e)),
        };

        match jsonschema::options().build(&schema_value) {
            Ok(v) => Ok(v),
            Err(e) => Err(format!("failed to compile schema: {}", e)),
        }
    });

    match result {
        Ok(v) => Ok(v),
        Err(e) => Err(SchemaError::LoadError(e.clone())),
    }
}

/// Validate an extracted response block against the evaluation schema.
///
/// Returns Ok(()) if valid, or the list of violation messages.
pub fn validate_evaluation(response_json: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(response_json)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_response_passes_schema() {
        let value = serde_json::json!({
            "criteria": [
                { "id": "C1", "met": true, "justification": "Mentions the virtual short." },
                { "id": "C2", "met": false, "justification": "Gain formula never derived." }
            ],
            "total_score": 4,
            "explanation": "One of two points covered."
        });
        assert!(validate_evaluation(&value).is_ok());
    }

    #[test]
    fn test_missing_required_field_fails() {
        let value = serde_json::json!({
            "criteria": [
                { "id": "C1", "met": true, "justification": "ok" }
            ]
            // Missing: total_score, explanation
        });
        let result = validate_evaluation(&value);
        assert!(result.is_err());
        assert!(!result.unwrap_err().is_empty());
    }

    #[test]
    fn test_empty_criteria_array_fails() {
        let value = serde_json::json!({
            "criteria": [],
            "total_score": 0,
            "explanation": "nothing graded"
        });
        assert!(validate_evaluation(&value).is_err());
    }

    #[test]
    fn test_non_boolean_met_fails() {
        let value = serde_json::json!({
            "criteria": [
                { "id": "C1", "met": "yes", "justification": "ok" }
            ],
            "total_score": 5,
            "explanation": "x"
        });
        assert!(validate_evaluation(&value).is_err());
    }

    #[test]
    fn test_extra_top_level_fields_tolerated() {
        // Models pad responses with fields the contract never asked for.
        let value = serde_json::json!({
            "criteria": [
                { "id": "C1", "met": true, "justification": "ok" }
            ],
            "total_score": 5,
            "explanation": "x",
            "confidence": 0.9
        });
        assert!(validate_evaluation(&value).is_ok());
    }
}
