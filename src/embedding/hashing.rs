use super::{Embedder, EmbedderIdentity, EmbeddingError};

const DIMENSIONS: usize = 384;
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic offline embedder for tests: FNV-1a feature hashing of
/// lowercase word unigrams and bigrams, signed, L2-normalised. Similarity is
/// purely lexical.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DIMENSIONS,
        }
    }
}

impl HashingEmbedder {
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let tokens = tokenize(text);

        let unigrams = tokens.iter().cloned();
        let bigrams = tokens.windows(2).map(|w| format!("{} {}", w[0], w[1]));
        for feature in unigrams.chain(bigrams) {
            let hash = fnv1a(feature.as_bytes());
            let slot = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[slot] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl Embedder for HashingEmbedder {
    fn identity(&self) -> EmbedderIdentity {
        EmbedderIdentity {
            provider: "test".to_string(),
            model: "fnv1a-word-ngrams".to_string(),
            dimensions: self.dimensions,
        }
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[test]
    fn fnv1a_matches_reference_values() {
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn tokenize_lowercases_and_drops_punctuation() {
        assert_eq!(
            tokenize("How do I reset my Password?"),
            vec!["how", "do", "i", "reset", "my", "password"]
        );
    }

    #[test]
    fn embedding_is_deterministic_and_normalised() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed_one("reset my password");
        let b = embedder.embed_one("reset my password");
        assert_eq!(a, b);
        assert_eq!(a.len(), 384);

        let norm = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_embeds_to_zero_vector() {
        let v = HashingEmbedder::default().embed_one("  ?! ");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn overlapping_text_scores_higher_than_unrelated() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed_one("I forgot my password, how do I reset it?");
        let related = embedder.embed_one("How do I reset my password?");
        let unrelated = embedder.embed_one("What are your shipping costs to Canada?");

        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn embed_preserves_input_order() {
        let embedder = HashingEmbedder::default();
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let vectors = embedder.embed(&texts).await.unwrap();
        assert_eq!(vectors[0], embedder.embed_one("alpha"));
        assert_eq!(vectors[1], embedder.embed_one("beta"));
    }
}
