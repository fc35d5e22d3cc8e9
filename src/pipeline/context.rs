use crate::answer::NO_CONTEXT;
use crate::faq::FaqEntry;

/// Reply used when neither generation nor retrieval produced anything.
pub const APOLOGY: &str = "I couldn't find relevant information to answer your question. Please try rephrasing or ask about something else.";

/// Numbers retrieved entries from 1 as `Q{i}`/`A{i}` pairs separated by blank
/// lines, or returns the no-context sentinel.
pub fn build_context(entries: &[FaqEntry]) -> String {
    if entries.is_empty() {
        return NO_CONTEXT.to_string();
    }
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| format!("Q{n}: {}\nA{n}: {}", e.question, e.answer, n = i + 1))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Generated answer, else the top-ranked FAQ answer verbatim, else the apology.
pub fn choose_answer(generated: Option<String>, retrieved: &[FaqEntry]) -> String {
    generated
        .or_else(|| retrieved.first().map(|e| e.answer.clone()))
        .unwrap_or_else(|| APOLOGY.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn faq(q: &str, a: &str) -> FaqEntry {
        FaqEntry {
            question: q.into(),
            answer: a.into(),
        }
    }

    #[test]
    fn empty_retrieval_uses_sentinel() {
        assert_eq!(
            build_context(&[]),
            "No relevant information found in the knowledge base."
        );
    }

    #[test]
    fn blocks_are_numbered_in_retrieval_order() {
        let context = build_context(&[
            faq("How do I reset my password?", "Click Forgot Password."),
            faq("How do I delete my account?", "Go to Settings."),
        ]);
        assert_eq!(
            context,
            "Q1: How do I reset my password?\nA1: Click Forgot Password.\n\nQ2: How do I delete my account?\nA2: Go to Settings."
        );
    }

    #[test]
    fn generated_answer_wins() {
        let retrieved = [faq("Q", "faq answer")];
        assert_eq!(
            choose_answer(Some("generated".into()), &retrieved),
            "generated"
        );
    }

    #[test]
    fn falls_back_to_top_entry_then_apology() {
        let retrieved = [faq("Q1", "first"), faq("Q2", "second")];
        assert_eq!(choose_answer(None, &retrieved), "first");
        assert_eq!(choose_answer(None, &[]), APOLOGY);
    }
}
