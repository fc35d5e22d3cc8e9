use tracing::warn;

use super::types::GenerateContentResponse;

/// Concatenated text of the first candidate. Empty when the model produced
/// nothing, e.g. after a safety block.
pub fn extract_text(response: &GenerateContentResponse) -> String {
    let candidate = response.candidates.as_ref().and_then(|c| c.first());

    let text: String = candidate
        .and_then(|c| c.content.as_ref())
        .map(|content| content.parts.iter().map(|p| p.text.as_str()).collect())
        .unwrap_or_default();

    if text.is_empty() {
        warn!(
            finish_reason = candidate
                .and_then(|c| c.finish_reason.as_deref())
                .unwrap_or("none"),
            "Gemini returned empty answer (safety filter or empty response)"
        );
    }
    text
}
