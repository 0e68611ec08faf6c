//! Prompt builder: renders an evaluation request for the reasoning backend.
//!
//! Rendering is a pure transformation. The same (question, rubric, answer)
//! always produce byte-identical output: no timestamps, no randomness, no
//! environment lookups. This is what makes evaluations reproducible and the
//! builder trivially testable.
//!
//! The rendered request has a fixed shape:
//! 1. Fairness directive (system half)
//! 2. Question text, verbatim
//! 3. Rubric, enumerated in rubric order
//! 4. Candidate answer, verbatim
//! 5. Output contract the parser enforces

use crate::types::Rubric;

/// System prompt establishing the grader role and the fairness directive.
///
/// The framing matters: the backend grades engineering substance only.
/// Transcribed speech arrives with filler words, odd punctuation and
/// dialect artifacts, and none of that may move the score.
pub const GRADER_SYSTEM_PROMPT: &str = r#"You are an impartial, expert technical interviewer. Grade the candidate's answer strictly against the rubric you are given.

## Fairness Directive
1. OBJECTIVITY: Grade solely on conceptual and technical correctness. Ignore spelling, grammar, punctuation, and sentence structure unless they destroy meaning.
2. TRANSCRIPTION TOLERANCE: The answer may be transcribed speech. Ignore filler words, repetitions, and transcription artifacts.
3. NO LENGTH BIAS: Do not penalize long answers that contain the correct information. Do not penalize short answers that hit the key points.
4. SEMANTIC MATCHING: Look for the meaning of each rubric point, not exact keywords.
5. CULTURAL NEUTRALITY: Do not infer or judge anything from the candidate's dialect, phrasing, or tone.

You evaluate ONLY the rubric criteria you are given. You do not invent criteria and you do not judge overall eloquence."#;

/// A rendered evaluation request, split into the system and user halves of
/// a chat-style completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

/// Render (question, rubric, answer) into an evaluation request.
///
/// An empty or whitespace-only answer is valid input here; short-circuiting
/// it without a backend call is the orchestrator's decision, not the
/// builder's.
pub fn build(question: &str, rubric: &Rubric, answer: &str) -> RenderedPrompt {
    let mut user = String::new();

    user.push_str(&format!("Question:\n\"{}\"\n\n", question));

    user.push_str("Rubric (score each criterion independently):\n");
    for (index, criterion) in rubric.criteria.iter().enumerate() {
        user.push_str(&format!(
            "{}. [{}] (weight {}) {}\n",
            index + 1,
            criterion.id,
            criterion.weight,
            criterion.description
        ));
    }

    user.push_str(&format!("\nCandidate answer:\n\"{}\"\n\n", answer));

    user.push_str(&output_contract(rubric));

    RenderedPrompt {
        system: GRADER_SYSTEM_PROMPT.to_string(),
        user,
    }
}

/// The output contract: one raw JSON object, one entry per criterion id.
fn output_contract(rubric: &Rubric) -> String {
    let ids: Vec<&str> = rubric.ids().collect();
    format!(
        r#"## Output Format
Return ONLY a raw JSON object (no markdown fences, no text before or after it) with exactly this shape:
{{
  "criteria": [
    {{ "id": "<criterion id>", "met": true, "justification": "<one sentence explaining the verdict>" }}
  ],
  "total_score": <number between 0 and {max}>,
  "explanation": "<one or two sentences summarizing the grading>"
}}
Include exactly one entry in "criteria" for each of these ids, in this order: {ids}.
"total_score" is the sum of the weights of the criteria that were met. Every entry needs a non-empty justification."#,
        max = rubric.max_score(),
        ids = ids.join(", ")
    )
}
