use std::path::PathBuf;
use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::{debug, info};

use super::{Embedder, EmbedderIdentity, EmbeddingError};

const MODEL_NAME: &str = "all-MiniLM-L6-v2";
const DIMENSIONS: usize = 384;

/// Free local embedder: sentence-transformers `all-MiniLM-L6-v2` run through
/// fastembed. The model is downloaded into the cache directory on first use
/// and loaded lazily, so identity checks never touch it.
pub struct LocalEmbedder {
    cache_dir: Option<PathBuf>,
    model: Mutex<Option<TextEmbedding>>,
}

impl LocalEmbedder {
    pub fn new(cache_dir: Option<PathBuf>) -> Self {
        Self {
            cache_dir,
            model: Mutex::new(None),
        }
    }

    pub fn model_identity() -> EmbedderIdentity {
        EmbedderIdentity {
            provider: "local".to_string(),
            model: MODEL_NAME.to_string(),
            dimensions: DIMENSIONS,
        }
    }

    fn load(&self) -> Result<TextEmbedding, EmbeddingError> {
        info!(model = MODEL_NAME, "loading local embedding model");
        let mut options =
            InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false);
        if let Some(dir) = &self.cache_dir {
            options = options.with_cache_dir(dir.clone());
        }
        TextEmbedding::try_new(options).map_err(|e| EmbeddingError::Model(e.to_string()))
    }
}

impl std::fmt::Debug for LocalEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEmbedder")
            .field("model", &MODEL_NAME)
            .field("cache_dir", &self.cache_dir)
            .finish()
    }
}

impl Embedder for LocalEmbedder {
    fn identity(&self) -> EmbedderIdentity {
        Self::model_identity()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut slot = self
            .model
            .lock()
            .map_err(|_| EmbeddingError::Model("embedding model lock poisoned".to_string()))?;
        let model = match slot.take() {
            Some(model) => model,
            None => self.load()?,
        };
        let model = slot.insert(model);

        let vectors = model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::Model(e.to_string()))?;
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                got: vectors.len(),
            });
        }
        debug!(count = texts.len(), "local embeddings complete");
        Ok(vectors.into_iter().map(normalize).collect())
    }
}

fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
    vector
}
