//! Question bank: read-only store of questions and their rubrics.
//!
//! Banks are authored as JSON or YAML files and loaded once at startup.
//! During evaluation the bank is never mutated, so no locking is needed
//! beyond sharing it behind an `Arc`.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::types::{Rubric, RubricError};

/// Errors that can occur when loading or querying a question bank.
#[derive(Error, Debug)]
pub enum BankError {
    #[error("failed to read bank file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("bank validation failed: {0}")]
    ValidationError(String),

    #[error("unknown question id: {id}")]
    UnknownQuestion { id: String },

    #[error("no questions found for topic: {topic}")]
    NoQuestionsForTopic { topic: String },
}

/// One bank entry: a question and the rubric used to score its answers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    /// Unique identifier within the bank
    pub id: String,

    /// Topic label used for selection (e.g., "ECE", "Aptitude")
    pub topic: String,

    /// The question shown to the candidate, verbatim
    pub text: String,

    /// Weighted scoring rubric for this question
    pub rubric: Rubric,
}

/// A read-only collection of questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionBank {
    pub questions: Vec<Question>,
}

impl QuestionBank {
    /// Parse a bank from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, BankError> {
        let bank: QuestionBank = serde_yaml::from_str(yaml)?;
        bank.validate()?;
        Ok(bank)
    }

    /// Parse a bank from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, BankError> {
        let bank: QuestionBank = serde_json::from_str(json)?;
        bank.validate()?;
        Ok(bank)
    }

    /// Parse a bank from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, BankError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse a bank from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, BankError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Validate bank structure: unique question ids, valid rubrics.
    fn validate(&self) -> Result<(), BankError> {
        let mut seen = std::collections::HashSet::new();

        for question in &self.questions {
            if question.id.is_empty() {
                return Err(BankError::ValidationError(
                    "question with empty id".to_string(),
                ));
            }
            if !seen.insert(question.id.as_str()) {
                return Err(BankError::ValidationError(format!(
                    "duplicate question id: {}",
                    question.id
                )));
            }
            question.rubric.validate().map_err(|e: RubricError| {
                BankError::ValidationError(format!("question {}: {}", question.id, e))
            })?;
        }

        Ok(())
    }

    /// Look up a question by id.
    pub fn get(&self, id: &str) -> Result<&Question, BankError> {
        self.questions
            .iter()
            .find(|q| q.id == id)
            .ok_or_else(|| BankError::UnknownQuestion { id: id.to_string() })
    }

    /// Look up a question's rubric by question id.
    pub fn rubric_for(&self, question_id: &str) -> Result<&Rubric, BankError> {
        self.get(question_id).map(|q| &q.rubric)
    }

    /// All questions whose topic contains `topic`, case-insensitively.
    pub fn by_topic(&self, topic: &str) -> Vec<&Question> {
        let needle = topic.to_lowercase();
        self.questions
            .iter()
            .filter(|q| q.topic.to_lowercase().contains(&needle))
            .collect()
    }

    /// Pick a random question for a topic.
    pub fn pick(&self, topic: &str) -> Result<&Question, BankError> {
        let candidates = self.by_topic(topic);
        candidates
            .choose(&mut rand::thread_rng())
            .copied()
            .ok_or_else(|| BankError::NoQuestionsForTopic {
                topic: topic.to_string(),
            })
    }

    /// Distinct topics in the bank, in first-seen order.
    pub fn topics(&self) -> Vec<&str> {
        let mut topics = Vec::new();
        for question in &self.questions {
            if !topics.contains(&question.topic.as_str()) {
                topics.push(question.topic.as_str());
            }
        }
        topics
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_BANK: &str = r#"
{
  "questions": [
    {
      "id": "ece-opamp-1",
      "topic": "ECE",
      "text": "Explain the ideal op-amp assumptions.",
      "rubric": {
        "criteria": [
          { "id": "C1", "description": "Infinite open-loop gain", "weight": 4.0 },
          { "id": "C2", "description": "Infinite input impedance", "weight": 3.0 },
          { "id": "C3", "description": "Zero output impedance", "weight": 3.0 }
        ]
      }
    },
    {
      "id": "apt-ratio-1",
      "topic": "Aptitude",
      "text": "If 3 workers finish a job in 12 days, how long do 4 workers take?",
      "rubric": {
        "criteria": [
          { "id": "C1", "description": "Inverse proportionality", "weight": 5.0 },
          { "id": "C2", "description": "Correct result of 9 days", "weight": 5.0 }
        ]
      }
    }
  ]
}
"#;

    #[test]
    fn test_parse_valid_bank() {
        let bank = QuestionBank::from_json(VALID_BANK).unwrap();
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.topics(), vec!["ECE", "Aptitude"]);
    }

    #[test]
    fn test_parse_yaml_bank() {
        let yaml = r#"
questions:
  - id: "q1"
    topic: "ECE"
    text: "What is a diode?"
    rubric:
      criteria:
        - id: "C1"
          description: "One-way conduction"
          weight: 10.0
"#;
        let bank = QuestionBank::from_yaml(yaml).unwrap();
        assert_eq!(bank.len(), 1);
        assert_eq!(bank.get("q1").unwrap().rubric.max_score(), 10.0);
    }

    #[test]
    fn test_rubric_lookup() {
        let bank = QuestionBank::from_json(VALID_BANK).unwrap();
        let rubric = bank.rubric_for("ece-opamp-1").unwrap();
        assert_eq!(rubric.max_score(), 10.0);
        assert!(bank.rubric_for("missing").is_err());
    }

    #[test]
    fn test_unknown_question_id() {
        let bank = QuestionBank::from_json(VALID_BANK).unwrap();
        let result = bank.get("missing");
        assert!(matches!(
            result,
            Err(BankError::UnknownQuestion { id }) if id == "missing"
        ));
    }

    #[test]
    fn test_duplicate_question_ids_rejected() {
        let json = r#"
{
  "questions": [
    { "id": "q1", "topic": "ECE", "text": "A?",
      "rubric": { "criteria": [ { "id": "C1", "description": "x", "weight": 1.0 } ] } },
    { "id": "q1", "topic": "ECE", "text": "B?",
      "rubric": { "criteria": [ { "id": "C1", "description": "y", "weight": 1.0 } ] } }
  ]
}
"#;
        let result = QuestionBank::from_json(json);
        assert!(matches!(result, Err(BankError::ValidationError(_))));
    }

    #[test]
    fn test_invalid_rubric_rejected_at_load() {
        let json = r#"
{
  "questions": [
    { "id": "q1", "topic": "ECE", "text": "A?",
      "rubric": { "criteria": [ { "id": "C1", "description": "x", "weight": -2.0 } ] } }
  ]
}
"#;
        let result = QuestionBank::from_json(json);
        assert!(matches!(result, Err(BankError::ValidationError(_))));
    }

    #[test]
    fn test_topic_filter_is_case_insensitive() {
        let bank = QuestionBank::from_json(VALID_BANK).unwrap();
        assert_eq!(bank.by_topic("ece").len(), 1);
        assert_eq!(bank.by_topic("APTITUDE").len(), 1);
        assert!(bank.by_topic("history").is_empty());
    }

    #[test]
    fn test_pick_returns_question_from_topic() {
        let bank = QuestionBank::from_json(VALID_BANK).unwrap();
        let question = bank.pick("ECE").unwrap();
        assert_eq!(question.topic, "ECE");

        let result = bank.pick("history");
        assert!(matches!(result, Err(BankError::NoQuestionsForTopic { .. })));
    }
}
