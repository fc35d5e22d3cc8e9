use std::fmt;

use crate::embedding::Embedder;
use crate::gemini::LanguageModel;
use crate::pipeline::QueryOrchestrator;
use crate::translate::TranslationBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("You"),
            Role::Assistant => f.write_str("Assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Append-only message history for one interactive session.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn push(&mut self, role: Role, content: String) {
        self.messages.push(Message { role, content });
    }

    /// Runs `input` through the pipeline and records both sides of the
    /// exchange, including error replies. Blank input is ignored.
    pub async fn submit<B, E, M>(
        &mut self,
        orchestrator: &QueryOrchestrator<B, E, M>,
        input: &str,
    ) -> Option<String>
    where
        B: TranslationBackend,
        E: Embedder,
        M: LanguageModel,
    {
        if input.trim().is_empty() {
            return None;
        }
        self.push(Role::User, input.to_string());
        let reply = orchestrator.respond(input).await;
        self.push(Role::Assistant, reply.clone());
        Some(reply)
    }

    /// Plain-text transcript, one labelled block per message.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
