//! Query orchestration: translate, retrieve, generate, fall back, translate back.

mod context;

pub use context::{build_context, choose_answer};

use tracing::{debug, error, info};

use crate::answer::AnswerGenerator;
use crate::embedding::Embedder;
use crate::gemini::LanguageModel;
use crate::faq::FaqEntry;
use crate::index::{FaqIndex, IndexError, ScoredEntry};
use crate::translate::{TranslateError, TranslationBackend, Translator};

/// FAQ entries retrieved as generation context per query.
pub const RETRIEVAL_K: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Runs one query at a time through the full pipeline. Holds no per-query
/// state; the index is read-only after startup.
pub struct QueryOrchestrator<B, E, M> {
    translator: Translator<B>,
    index: FaqIndex<E>,
    generator: AnswerGenerator<M>,
}

impl<B, E, M> QueryOrchestrator<B, E, M>
where
    B: TranslationBackend,
    E: Embedder,
    M: LanguageModel,
{
    pub fn new(translator: Translator<B>, index: FaqIndex<E>, generator: AnswerGenerator<M>) -> Self {
        Self {
            translator,
            index,
            generator,
        }
    }

    #[cfg(test)]
    pub fn translator(&self) -> &Translator<B> {
        &self.translator
    }

    #[cfg(test)]
    pub fn index(&self) -> &FaqIndex<E> {
        &self.index
    }

    /// Answer in the language of `input`, or the first unrecovered failure.
    /// Generation failures are not failures here: they select a fallback.
    pub async fn answer(&self, input: &str) -> Result<String, QueryError> {
        Ok(self.answer_with_sources(input).await?.0)
    }

    /// Like `answer`, also returning the retrieved entries with their scores.
    pub async fn answer_with_sources(
        &self,
        input: &str,
    ) -> Result<(String, Vec<ScoredEntry>), QueryError> {
        let (language, pivot) = self.translator.detect_and_translate_to_pivot(input).await?;
        debug!(language = %language, pivot = %pivot, "query translated");

        let sources = self.index.search_scored(&pivot, RETRIEVAL_K).await?;
        let retrieved: Vec<FaqEntry> = sources.iter().map(|s| s.entry.clone()).collect();
        let context = build_context(&retrieved);

        let generated = self.generator.generate(&pivot, &context).await;
        if generated.is_none() {
            info!(
                retrieved = retrieved.len(),
                "no generated answer, using fallback"
            );
        }
        let answer = choose_answer(generated, &retrieved);

        let translated = self.translator.from_pivot(&answer, &language).await?;
        Ok((translated, sources))
    }

    /// Like `answer`, but failures become a user-facing message.
    pub async fn respond(&self, input: &str) -> String {
        self.answer(input)
            .await
            .unwrap_or_else(|e| error_reply(&e))
    }
}

/// User-facing text for a failed query.
pub fn error_reply(e: &QueryError) -> String {
    error!(error = %e, "query failed");
    format!("I encountered an error: Error processing query: {e}")
}
