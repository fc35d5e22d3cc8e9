//! Text embedding backends: a paid OpenAI API embedder and a free local
//! MiniLM embedder, selected once at construction.

#[cfg(test)]
mod hashing;
pub mod local;
pub mod openai;

#[cfg(test)]
pub use hashing::HashingEmbedder;
pub use local::LocalEmbedder;
pub use openai::OpenAiEmbedder;

use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{Config, Secret};

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding API rate limit exceeded")]
    RateLimited,

    #[error("embedding API quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("embedding API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("embedding API returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },

    #[error("local embedding model error: {0}")]
    Model(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl EmbeddingError {
    /// Errors that justify switching to the free embedder during an offline build.
    pub fn is_quota_class(&self) -> bool {
        matches!(
            self,
            EmbeddingError::RateLimited | EmbeddingError::QuotaExhausted(_)
        )
    }
}

/// Which embedder produced a set of vectors. Persisted with the index;
/// vectors from different identities are not comparable.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EmbedderIdentity {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
}

impl std::fmt::Display for EmbedderIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} ({}d)", self.provider, self.model, self.dimensions)
    }
}

/// Turns text into fixed-length vectors.
pub trait Embedder {
    fn identity(&self) -> EmbedderIdentity;

    /// One vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// The embedder chosen for this process.
#[derive(Debug, Clone)]
pub enum EmbeddingBackend {
    OpenAi(OpenAiEmbedder),
    Local(Arc<LocalEmbedder>),
}

impl EmbeddingBackend {
    /// OpenAI when the config opts in with a key, the local model otherwise.
    pub fn from_config(http: Client, config: &Config) -> Self {
        match &config.openai_api_key {
            Some(key) if config.wants_paid_embeddings() => Self::paid(http, key.clone()),
            _ => Self::free(config),
        }
    }

    /// The embedder a persisted index was built with, when this process can
    /// construct it. An index written by the quota fallback therefore stays
    /// queryable while the config still asks for paid embeddings.
    pub fn for_stored(http: Client, config: &Config, stored: Option<&EmbedderIdentity>) -> Self {
        let configured = if config.wants_paid_embeddings() {
            OpenAiEmbedder::model_identity()
        } else {
            LocalEmbedder::model_identity()
        };

        if let Some(stored) = stored
            && *stored != configured
        {
            if *stored == LocalEmbedder::model_identity() {
                warn!(%stored, %configured, "index was built with the free embedder, using it for queries");
                return Self::free(config);
            }
            if *stored == OpenAiEmbedder::model_identity()
                && let Some(key) = &config.openai_api_key
            {
                warn!(%stored, %configured, "index was built with OpenAI embeddings, using them for queries");
                return Self::paid(http, key.clone());
            }
        }
        Self::from_config(http, config)
    }

    pub fn paid(http: Client, api_key: Secret) -> Self {
        info!("using OpenAI embeddings");
        Self::OpenAi(OpenAiEmbedder::new(http, api_key))
    }

    pub fn free(config: &Config) -> Self {
        info!("using local MiniLM embeddings");
        Self::Local(Arc::new(LocalEmbedder::new(config.model_cache_dir.clone())))
    }
}

impl Embedder for EmbeddingBackend {
    fn identity(&self) -> EmbedderIdentity {
        match self {
            Self::OpenAi(e) => e.identity(),
            Self::Local(e) => e.identity(),
        }
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        match self {
            Self::OpenAi(e) => e.embed(texts).await,
            Self::Local(e) => e.embed(texts).await,
        }
    }
}

/// Cosine similarity; zero when either vector has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_class_covers_rate_limit_and_quota() {
        assert!(EmbeddingError::RateLimited.is_quota_class());
        assert!(EmbeddingError::QuotaExhausted("insufficient_quota".into()).is_quota_class());
        assert!(
            !EmbeddingError::Api {
                code: 500,
                message: "boom".into()
            }
            .is_quota_class()
        );
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = [0.3, 0.4, 0.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn cosine_with_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn backend_selection_follows_config() {
        let free = Config::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".into()),
            _ => None,
        });
        assert!(matches!(
            EmbeddingBackend::from_config(Client::new(), &free),
            EmbeddingBackend::Local(_)
        ));

        let paid = Config::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".into()),
            "USE_OPENAI_EMBEDDINGS" => Some("true".into()),
            _ => None,
        });
        let backend = EmbeddingBackend::from_config(Client::new(), &paid);
        assert!(matches!(backend, EmbeddingBackend::OpenAi(_)));
        assert_eq!(backend.identity().provider, "openai");
    }

    fn paid_config() -> Config {
        Config::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".into()),
            "USE_OPENAI_EMBEDDINGS" => Some("true".into()),
            _ => None,
        })
    }

    #[test]
    fn stored_free_index_wins_over_paid_config() {
        let stored = LocalEmbedder::model_identity();
        let backend = EmbeddingBackend::for_stored(Client::new(), &paid_config(), Some(&stored));
        assert!(matches!(backend, EmbeddingBackend::Local(_)));
        assert_eq!(backend.identity(), stored);
    }

    #[test]
    fn stored_paid_index_is_used_when_a_key_exists() {
        let config = Config::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".into()),
            _ => None,
        });
        let stored = OpenAiEmbedder::model_identity();
        let backend = EmbeddingBackend::for_stored(Client::new(), &config, Some(&stored));
        assert!(matches!(backend, EmbeddingBackend::OpenAi(_)));
    }

    #[test]
    fn unknown_or_missing_stored_identity_follows_config() {
        let foreign = EmbedderIdentity {
            provider: "other".into(),
            model: "m".into(),
            dimensions: 3,
        };
        let backend = EmbeddingBackend::for_stored(Client::new(), &paid_config(), Some(&foreign));
        assert!(matches!(backend, EmbeddingBackend::OpenAi(_)));

        let backend = EmbeddingBackend::for_stored(Client::new(), &paid_config(), None);
        assert!(matches!(backend, EmbeddingBackend::OpenAi(_)));

        let free = Config::from_lookup(|_| None);
        let stored = OpenAiEmbedder::model_identity();
        let backend = EmbeddingBackend::for_stored(Client::new(), &free, Some(&stored));
        assert!(matches!(backend, EmbeddingBackend::Local(_)));
    }
}
