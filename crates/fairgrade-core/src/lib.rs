//! # fairgrade-core
//!
//! Deterministic core of the FairGrade answer evaluation engine.
//!
//! This crate owns everything that does NOT talk to the reasoning backend:
//! - The data model: rubrics, questions, evaluation requests and results
//! - The prompt builder: renders (question, rubric, answer) into an
//!   evaluation request with the fairness directive and output contract
//! - The response parser: turns raw backend text into a validated
//!   [`EvaluationResult`], or fails loudly with `MalformedResponse`
//! - The question bank adapter: read-only store of questions and their
//!   scoring rubrics
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic rendering**: identical (question, rubric, answer)
//!    always produce an identical prompt
//! 2. **No LLM calls**: this crate never performs network I/O
//! 3. **The rubric owns the ceiling**: `max_score` is always recomputed
//!    from rubric weights, never taken from backend text
//! 4. **No unexplained scores**: a criterion marked met without a
//!    justification is rejected as malformed
//!
//! ## Example
//!
//! ```rust,ignore
//! use fairgrade_core::{parser, prompt, Rubric};
//!
//! let rubric = Rubric::new(criteria)?;
//! let rendered = prompt::build("What is an opamp?", &rubric, answer);
//! // ... send `rendered` to the backend, receive `raw` ...
//! let result = parser::parse(&raw, &rubric)?;
//! println!("{}/{}", result.total_score, result.max_score);
//! ```

pub mod bank;
pub mod parser;
pub mod prompt;
pub mod schema;
pub mod types;

// Re-export main types at crate root
pub use bank::{BankError, Question, QuestionBank};
pub use prompt::RenderedPrompt;
pub use types::{
    Criterion, CriterionOutcome, EvaluationError, EvaluationErrorKind, EvaluationRequest,
    EvaluationResult, Rubric, RubricError,
};
