//! Language detection and pivot-language translation.

pub mod client;
mod types;

pub use client::GoogleTranslateClient;

use std::fmt;

/// Every translation is routed through this language.
pub const PIVOT_LANGUAGE: &str = "en";

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("cannot detect the language of empty text")]
    EmptyText,

    #[error("language detection failed: {0}")]
    Detection(String),

    #[error("Translation API rate limit exceeded")]
    RateLimited,

    #[error("Translation API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("invalid Translation API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Remote detection/translation capability.
/// Implemented by `GoogleTranslateClient`; tests substitute in-memory backends.
pub trait TranslationBackend {
    /// Best-guess language code, or `None` when the backend could not tell.
    async fn detect_language(&self, text: &str) -> Result<Option<String>, TranslateError>;

    async fn translate(&self, text: &str, target: &str) -> Result<String, TranslateError>;
}

/// ISO-like language code as reported by the translation backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    #[cfg(test)]
    pub fn pivot() -> Self {
        Self(PIVOT_LANGUAGE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_pivot(&self) -> bool {
        self.0.eq_ignore_ascii_case(PIVOT_LANGUAGE)
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pivot-aware wrapper over a translation backend.
///
/// Translations where source or target already is the pivot language are
/// answered locally without a backend call.
pub struct Translator<B> {
    backend: B,
}

impl<B: TranslationBackend> Translator<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    #[cfg(test)]
    pub(crate) fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn detect(&self, text: &str) -> Result<LanguageCode, TranslateError> {
        if text.trim().is_empty() {
            return Err(TranslateError::EmptyText);
        }
        self.backend
            .detect_language(text)
            .await?
            .map(LanguageCode::new)
            .ok_or_else(|| TranslateError::Detection("backend returned no language".to_string()))
    }

    pub async fn to_pivot(&self, text: &str) -> Result<String, TranslateError> {
        if self.detect(text).await?.is_pivot() {
            return Ok(text.to_string());
        }
        self.backend.translate(text, PIVOT_LANGUAGE).await
    }

    pub async fn from_pivot(
        &self,
        text: &str,
        target: &LanguageCode,
    ) -> Result<String, TranslateError> {
        if target.is_pivot() {
            return Ok(text.to_string());
        }
        self.backend.translate(text, target.as_str()).await
    }

    /// Detects the input language and translates the input to the pivot.
    /// `to_pivot` detects again internally, so non-pivot input costs two
    /// detection calls and one translation call.
    pub async fn detect_and_translate_to_pivot(
        &self,
        text: &str,
    ) -> Result<(LanguageCode, String), TranslateError> {
        let language = self.detect(text).await?;
        let pivot_text = self.to_pivot(text).await?;
        Ok((language, pivot_text))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Dictionary-backed translator. Unknown text is detected as English and
    /// translated by tagging it with the target language.
    #[derive(Default)]
    pub struct DictionaryBackend {
        languages: HashMap<String, String>,
        translations: HashMap<(String, String), String>,
        pub calls: Mutex<Vec<String>>,
        pub unreachable: bool,
    }

    impl DictionaryBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn unreachable() -> Self {
            Self {
                unreachable: true,
                ..Self::default()
            }
        }

        pub fn language(mut self, text: &str, code: &str) -> Self {
            self.languages.insert(text.to_string(), code.to_string());
            self
        }

        pub fn translation(mut self, text: &str, target: &str, result: &str) -> Self {
            self.translations
                .insert((text.to_string(), target.to_string()), result.to_string());
            self.languages
                .entry(result.to_string())
                .or_insert_with(|| target.to_string());
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl TranslationBackend for DictionaryBackend {
        async fn detect_language(&self, text: &str) -> Result<Option<String>, TranslateError> {
            self.calls.lock().unwrap().push(format!("detect:{text}"));
            if self.unreachable {
                return Err(TranslateError::Api {
                    code: 503,
                    message: "backend unreachable".into(),
                });
            }
            Ok(Some(
                self.languages
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| PIVOT_LANGUAGE.to_string()),
            ))
        }

        async fn translate(&self, text: &str, target: &str) -> Result<String, TranslateError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("translate:{target}:{text}"));
            if self.unreachable {
                return Err(TranslateError::Api {
                    code: 503,
                    message: "backend unreachable".into(),
                });
            }
            Ok(self
                .translations
                .get(&(text.to_string(), target.to_string()))
                .cloned()
                .unwrap_or_else(|| format!("[{target}] {text}")))
        }
    }
}
