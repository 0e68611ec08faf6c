//! Hint assistant: the practice companion chat.
//!
//! Answers questions about using the tool and explains technical
//! concepts, but only ever hints at interview answers. Served by the
//! same backend as grading, under the same timeout and retry policy.

use std::sync::Arc;

use fairgrade_core::types::EvaluationError;

use crate::backends::{ChatMessage, CompletionBackend};
use crate::client::BackendClient;
use crate::config::EvaluatorConfig;
use crate::usage::UsageLog;

/// System prompt framing the assistant. Hints only: handing out full
/// answers would defeat the practice loop.
pub const ASSISTANT_SYSTEM_PROMPT: &str = r#"You are the FairGrade practice assistant.

- Help candidates understand how to use this interview-practice tool.
- Explain technical concepts when asked.
- Be encouraging and concrete.
- Never give full answers to interview questions. Offer hints, analogies, and pointers to the underlying concept instead."#;

/// Context-aware helper chat for candidates.
pub struct HintAssistant {
    client: BackendClient,
}

impl HintAssistant {
    pub fn new(backend: Arc<dyn CompletionBackend>, config: &EvaluatorConfig) -> Self {
        Self {
            client: BackendClient::new(backend, config, Arc::new(UsageLog::new())),
        }
    }

    /// Ask the assistant a question.
    pub async fn ask(&self, message: &str) -> Result<String, EvaluationError> {
        if message.trim().is_empty() {
            return Err(EvaluationError::EmptyAnswer);
        }

        let messages = vec![
            ChatMessage::system(ASSISTANT_SYSTEM_PROMPT),
            ChatMessage::user(message),
        ];
        self.client.send_messages(messages).await
    }
}
