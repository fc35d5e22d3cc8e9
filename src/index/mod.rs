//! Persisted nearest-neighbor index over FAQ questions.

mod rebuild;
mod store;

pub use rebuild::build_with_fallback;

use std::cmp::Ordering;
use std::path::PathBuf;

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::embedding::{
    Embedder, EmbedderIdentity, EmbeddingBackend, EmbeddingError, cosine_similarity,
};
use crate::faq::{self, FaqEntry, FaqError};
use store::{FORMAT_VERSION, INDEX_FILE, IndexedEntry, PersistedIndex};

/// Answer returned by `best_match` when the index holds nothing.
pub const NO_MATCH_ANSWER: &str = "I could not find a relevant answer.";

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error(transparent)]
    Faq(#[from] FaqError),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("index I/O error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid index file {path}: {source}")]
    Format {
        path: String,
        source: serde_json::Error,
    },

    #[error("unsupported index format version {0}")]
    UnsupportedVersion(u32),

    #[error(
        "index was built with {stored} but the active embedder is {active}; run `build-index` to rebuild"
    )]
    EmbedderMismatch {
        stored: EmbedderIdentity,
        active: EmbedderIdentity,
    },

    #[error("k must be at least 1")]
    InvalidK,
}

/// Where the index lives and which FAQ file it is derived from.
#[derive(Debug, Clone)]
pub struct IndexLocation {
    pub dir: PathBuf,
    pub faq_path: PathBuf,
}

impl IndexLocation {
    pub fn new(dir: impl Into<PathBuf>, faq_path: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            faq_path: faq_path.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.index_dir, &config.faq_path)
    }

    pub fn index_file(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }
}

/// A FAQ entry with its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub entry: FaqEntry,
    pub score: f32,
}

/// Read-only similarity index. Only obtainable from `build` or `load`, so it
/// is never queried before its vectors match the FAQ source.
#[derive(Debug)]
pub struct FaqIndex<E> {
    embedder: E,
    entries: Vec<IndexedEntry>,
}

impl<E: Embedder> FaqIndex<E> {
    /// Embeds every question and persists the result. Full rebuild only.
    pub async fn build(
        embedder: E,
        location: &IndexLocation,
        faqs: Vec<FaqEntry>,
    ) -> Result<Self, IndexError> {
        let identity = embedder.identity();
        info!(count = faqs.len(), embedder = %identity, "creating embeddings for FAQs");

        let questions: Vec<String> = faqs.iter().map(|f| f.question.clone()).collect();
        let vectors = embedder.embed(&questions).await?;
        if vectors.len() != faqs.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: faqs.len(),
                got: vectors.len(),
            }
            .into());
        }

        let faq_digest = faq::digest(&faqs);
        let entries: Vec<IndexedEntry> = faqs
            .into_iter()
            .zip(vectors)
            .map(|(faq, vector)| IndexedEntry {
                question: faq.question,
                answer: faq.answer,
                vector,
            })
            .collect();

        let persisted = PersistedIndex {
            version: FORMAT_VERSION,
            embedder: identity,
            faq_digest,
            entries,
        };
        let path = location.index_file();
        store::write(&path, &persisted)?;
        info!(path = %path.display(), "index saved");

        Ok(Self {
            embedder,
            entries: persisted.entries,
        })
    }

    /// Restores the persisted index. Builds it from the FAQ file when none
    /// exists yet, and rebuilds when the FAQ file changed since the last build.
    pub async fn load(embedder: E, location: &IndexLocation) -> Result<Self, IndexError> {
        let path = location.index_file();
        if !path.exists() {
            info!(path = %path.display(), "no index found, creating a new one");
            let faqs = faq::load_faqs(&location.faq_path)?;
            return Self::build(embedder, location, faqs).await;
        }

        let persisted = store::read(&path)?;
        if persisted.version != FORMAT_VERSION {
            return Err(IndexError::UnsupportedVersion(persisted.version));
        }
        let active = embedder.identity();
        if persisted.embedder != active {
            return Err(IndexError::EmbedderMismatch {
                stored: persisted.embedder,
                active,
            });
        }

        if location.faq_path.exists() {
            let faqs = faq::load_faqs(&location.faq_path)?;
            if faq::digest(&faqs) != persisted.faq_digest {
                warn!(
                    faq_path = %location.faq_path.display(),
                    "FAQ source changed since the index was built, rebuilding"
                );
                return Self::build(embedder, location, faqs).await;
            }
        } else {
            warn!(
                faq_path = %location.faq_path.display(),
                "FAQ source missing, using the stored index as is"
            );
        }

        info!(path = %path.display(), entries = persisted.entries.len(), "index loaded");
        Ok(Self {
            embedder,
            entries: persisted.entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn identity(&self) -> EmbedderIdentity {
        self.embedder.identity()
    }

    /// Up to `k` entries by non-increasing cosine similarity. Ties keep FAQ
    /// file order. There is no similarity threshold.
    pub async fn search_scored(&self, query: &str, k: usize) -> Result<Vec<ScoredEntry>, IndexError> {
        if k == 0 {
            return Err(IndexError::InvalidK);
        }
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or(EmbeddingError::CountMismatch {
                expected: 1,
                got: 0,
            })?;

        let mut scored: Vec<ScoredEntry> = self
            .entries
            .iter()
            .map(|e| ScoredEntry {
                entry: FaqEntry {
                    question: e.question.clone(),
                    answer: e.answer.clone(),
                },
                score: cosine_similarity(&query_vector, &e.vector),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        if let Some(top) = scored.first() {
            debug!(
                query = %truncate_chars(query, 70),
                top = %truncate_chars(&top.entry.question, 70),
                score = top.score,
                "similarity search"
            );
        }
        Ok(scored)
    }

    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<FaqEntry>, IndexError> {
        Ok(self
            .search_scored(query, k)
            .await?
            .into_iter()
            .map(|s| s.entry)
            .collect())
    }

    pub async fn best_match(&self, query: &str) -> Result<FaqEntry, IndexError> {
        Ok(self
            .search(query, 1)
            .await?
            .into_iter()
            .next()
            .unwrap_or_else(|| FaqEntry {
                question: String::new(),
                answer: NO_MATCH_ANSWER.to_string(),
            }))
    }
}

/// Embedder recorded in the persisted index, if one exists.
pub fn stored_identity(location: &IndexLocation) -> Result<Option<EmbedderIdentity>, IndexError> {
    let path = location.index_file();
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(store::read(&path)?.embedder))
}

/// Embedder for querying the index at `location`: the one the index was
/// built with when this process can construct it, the configured one otherwise.
pub fn query_embedder(
    http: Client,
    config: &Config,
    location: &IndexLocation,
) -> Result<EmbeddingBackend, IndexError> {
    let stored = stored_identity(location)?;
    Ok(EmbeddingBackend::for_stored(http, config, stored.as_ref()))
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
