use tracing::{debug, warn};

use crate::gemini::LanguageModel;
use crate::index::truncate_chars;

/// Context used when retrieval found nothing. The generator never calls the
/// model with it.
pub const NO_CONTEXT: &str = "No relevant information found in the knowledge base.";

const SYSTEM_TEMPLATE: &str = "You are a helpful AI assistant with access to a knowledge base.

You have access to the following relevant information from the knowledge base:

{context}

Based on this information, answer the user's question directly and accurately.
- If the information directly answers the question, provide a clear, helpful answer
- If the information is related but doesn't fully answer the question, use it to provide the best answer you can
- If the information doesn't relate to the question, say so politely
- Be conversational, natural, and helpful
- Don't just repeat the FAQ answers - actually answer what the user is asking
- Synthesize information from multiple sources if relevant
- Keep answers concise but complete";

pub fn system_instruction(context: &str) -> String {
    SYSTEM_TEMPLATE.replace("{context}", context)
}

/// Context-grounded answer generation over a language model.
///
/// `generate` returns `None` (the no-answer signal) instead of failing, so
/// callers can fall back to retrieved FAQ answers.
pub struct AnswerGenerator<M> {
    model: M,
}

impl<M: LanguageModel> AnswerGenerator<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    #[cfg(test)]
    pub(crate) fn model(&self) -> &M {
        &self.model
    }

    pub async fn generate(&self, question: &str, context: &str) -> Option<String> {
        if question.trim().is_empty() {
            return None;
        }
        let trimmed_context = context.trim();
        if trimmed_context.is_empty() || trimmed_context == NO_CONTEXT {
            debug!("no retrieval context, skipping generation");
            return None;
        }

        let answer = match self
            .model
            .generate(&system_instruction(context), question)
            .await
        {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(
                    error = %e,
                    question = %truncate_chars(question, 100),
                    context_len = context.len(),
                    "answer generation failed"
                );
                return None;
            }
        };

        if answer.is_empty() || echoes_error(&answer) {
            debug!(answer = %truncate_chars(&answer, 100), "discarding generated answer");
            return None;
        }
        Some(answer)
    }
}

/// Guards against the model repeating an earlier error message as its answer.
fn echoes_error(answer: &str) -> bool {
    let lower = answer.to_lowercase();
    lower.contains("error") && lower.contains("encountered")
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::gemini::client::GeminiError;
    use std::sync::Mutex;

    /// Model returning a fixed reply (or failing), recording every prompt.
    pub struct CannedModel {
        reply: Option<String>,
        pub prompts: Mutex<Vec<(String, String)>>,
    }

    impl CannedModel {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn unreachable() -> Self {
            Self {
                reply: None,
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn prompts(&self) -> Vec<(String, String)> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl LanguageModel for CannedModel {
        async fn generate(&self, system: &str, prompt: &str) -> Result<String, GeminiError> {
            self.prompts
                .lock()
                .unwrap()
                .push((system.to_string(), prompt.to_string()));
            self.reply.clone().ok_or(GeminiError::Api {
                code: 503,
                message: "Service Unavailable".into(),
            })
        }
    }
}
