//! Service self-test: exercises each backend once with a known sample.

use std::fmt;

use tracing::warn;

use crate::answer::AnswerGenerator;
use crate::embedding::Embedder;
use crate::gemini::LanguageModel;
use crate::index::{FaqIndex, IndexLocation};
use crate::translate::{LanguageCode, TranslationBackend, Translator};

const SPANISH_SAMPLE: &str = "¿Cómo restablezco mi contraseña?";
const ENGLISH_SAMPLE: &str = "How do I reset my password?";
const GENERATION_CONTEXT: &str =
    "Q1: How do I reset my password?\nA1: Click on 'Forgot Password' on the login page.";
const GENERATION_QUESTION: &str = "I forgot my password, what should I do?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Passed,
    Failed,
    Skipped,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Passed => f.write_str("PASSED"),
            Status::Failed => f.write_str("FAILED"),
            Status::Skipped => f.write_str("SKIPPED"),
        }
    }
}

/// Outcome of one service check plus the lines worth showing the user.
#[derive(Debug)]
pub struct ServiceReport {
    pub service: &'static str,
    pub status: Status,
    pub details: Vec<String>,
}

impl ServiceReport {
    fn new(service: &'static str) -> Self {
        Self {
            service,
            status: Status::Passed,
            details: Vec::new(),
        }
    }

    fn fail(mut self, reason: impl fmt::Display) -> Self {
        warn!(service = self.service, %reason, "self-test failed");
        self.status = Status::Failed;
        self.details.push(format!("{} failed: {reason}", self.service));
        self
    }
}

pub async fn check_translation<B: TranslationBackend>(translator: &Translator<B>) -> ServiceReport {
    let mut report = ServiceReport::new("Translation");

    let language = match translator.detect(SPANISH_SAMPLE).await {
        Ok(l) => l,
        Err(e) => return report.fail(e),
    };
    report
        .details
        .push(format!("Language detection: '{SPANISH_SAMPLE}' -> {language}"));

    match translator.to_pivot(SPANISH_SAMPLE).await {
        Ok(text) => report.details.push(format!("Translation to English: '{text}'")),
        Err(e) => return report.fail(e),
    }

    match translator
        .from_pivot(ENGLISH_SAMPLE, &LanguageCode::new("es"))
        .await
    {
        Ok(text) => report.details.push(format!("Translation to Spanish: '{text}'")),
        Err(e) => return report.fail(e),
    }
    report
}

pub async fn check_index<E: Embedder>(embedder: E, location: &IndexLocation) -> ServiceReport {
    let report = ServiceReport::new("Vector Store");

    let index = match FaqIndex::load(embedder, location).await {
        Ok(index) => index,
        Err(e) => return report.fail(e),
    };
    match index.best_match(ENGLISH_SAMPLE).await {
        Ok(best) => {
            let mut report = report;
            let preview: String = best.answer.chars().take(100).collect();
            report.details.push(format!("Query: '{ENGLISH_SAMPLE}'"));
            report.details.push(format!("  Matched: '{}'", best.question));
            report.details.push(format!("  Answer: '{preview}...'"));
            report
        }
        Err(e) => report.fail(e),
    }
}

/// `None` when no project is configured; generation is then skipped.
pub async fn check_generation<M: LanguageModel>(generator: Option<&AnswerGenerator<M>>) -> ServiceReport {
    let mut report = ServiceReport::new("Vertex AI");
    let Some(generator) = generator else {
        report.status = Status::Skipped;
        report
            .details
            .push("GCP_PROJECT_ID not set, skipping Vertex AI test".to_string());
        return report;
    };

    match generator
        .generate(GENERATION_QUESTION, GENERATION_CONTEXT)
        .await
    {
        Some(answer) => {
            report.details.push(format!("Question: '{GENERATION_QUESTION}'"));
            report.details.push(format!("  Answer: '{answer}'"));
            report
        }
        None => report.fail("no answer generated; check that Vertex AI is enabled and credentials are set"),
    }
}

pub fn format_summary(reports: &[ServiceReport]) -> String {
    let mut output = String::from("Test Summary\n");
    for report in reports {
        output.push_str(&format!("{}: {}\n", report.service, report.status));
    }

    let verdict = if reports.iter().any(|p| p.status == Status::Failed) {
        "Some tests failed. Please check your configuration."
    } else if reports.iter().all(|p| p.status == Status::Passed) {
        "All tests passed!"
    } else {
        "Tests completed with warnings."
    };
    output.push('\n');
    output.push_str(verdict);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::testing::CannedModel;
    use crate::embedding::HashingEmbedder;
    use crate::faq::FaqEntry;
    use crate::translate::testing::DictionaryBackend;

    fn report(service: &'static str, status: Status) -> ServiceReport {
        ServiceReport {
            service,
            status,
            details: vec![],
        }
    }

    #[test]
    fn summary_all_passed() {
        let text = format_summary(&[report("Translation", Status::Passed)]);
        assert!(text.contains("Translation: PASSED"));
        assert!(text.ends_with("All tests passed!"));
    }

    #[test]
    fn summary_skipped_is_a_warning() {
        let text = format_summary(&[
            report("Translation", Status::Passed),
            report("Vertex AI", Status::Skipped),
        ]);
        assert!(text.contains("Vertex AI: SKIPPED"));
        assert!(text.ends_with("Tests completed with warnings."));
    }

    #[test]
    fn summary_failure_wins() {
        let text = format_summary(&[
            report("Translation", Status::Failed),
            report("Vertex AI", Status::Skipped),
        ]);
        assert!(text.ends_with("Some tests failed. Please check your configuration."));
    }

    #[tokio::test]
    async fn translation_check_reports_each_step() {
        let backend = DictionaryBackend::new()
            .language(SPANISH_SAMPLE, "es")
            .translation(SPANISH_SAMPLE, "en", ENGLISH_SAMPLE);
        let result = check_translation(&Translator::new(backend)).await;

        assert_eq!(result.status, Status::Passed);
        assert_eq!(result.details.len(), 3);
        assert!(result.details[0].ends_with("-> es"));
    }

    #[tokio::test]
    async fn translation_check_fails_on_backend_error() {
        let result = check_translation(&Translator::new(DictionaryBackend::unreachable())).await;
        assert_eq!(result.status, Status::Failed);
    }

    #[tokio::test]
    async fn index_check_builds_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        let location = IndexLocation::new(dir.path().join("index"), dir.path().join("faqs.json"));
        let faqs = vec![FaqEntry {
            question: ENGLISH_SAMPLE.into(),
            answer: "Click Forgot Password.".into(),
        }];
        std::fs::write(&location.faq_path, serde_json::to_string(&faqs).unwrap()).unwrap();

        let result = check_index(HashingEmbedder::default(), &location).await;
        assert_eq!(result.status, Status::Passed);
        assert!(result.details[1].contains(ENGLISH_SAMPLE));
    }

    #[tokio::test]
    async fn index_check_fails_without_faq_file() {
        let dir = tempfile::tempdir().unwrap();
        let location = IndexLocation::new(dir.path().join("index"), dir.path().join("faqs.json"));
        let result = check_index(HashingEmbedder::default(), &location).await;
        assert_eq!(result.status, Status::Failed);
    }

    #[tokio::test]
    async fn generation_check_skips_without_project() {
        let result = check_generation::<CannedModel>(None).await;
        assert_eq!(result.status, Status::Skipped);
    }

    #[tokio::test]
    async fn generation_check_passes_and_fails() {
        let ok = AnswerGenerator::new(CannedModel::replying("Use the reset link."));
        assert_eq!(check_generation(Some(&ok)).await.status, Status::Passed);

        let down = AnswerGenerator::new(CannedModel::unreachable());
        assert_eq!(check_generation(Some(&down)).await.status, Status::Failed);
    }
}
