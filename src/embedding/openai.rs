use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Embedder, EmbedderIdentity, EmbeddingError};
use crate::config::Secret;

const API_BASE: &str = "https://api.openai.com/v1";
const MODEL: &str = "text-embedding-3-small";
const DIMENSIONS: usize = 1536;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
}

/// OpenAI `/v1/embeddings` client (paid, requires credits).
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    http: Client,
    api_key: Secret,
    base_url: String,
}

impl OpenAiEmbedder {
    pub fn new(http: Client, api_key: Secret) -> Self {
        Self {
            http,
            api_key,
            base_url: API_BASE.to_string(),
        }
    }

    pub fn model_identity() -> EmbedderIdentity {
        EmbedderIdentity {
            provider: "openai".to_string(),
            model: MODEL.to_string(),
            dimensions: DIMENSIONS,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: Secret::new("sk-test"),
            base_url: base_url.to_string(),
        }
    }
}

impl Embedder for OpenAiEmbedder {
    fn identity(&self) -> EmbedderIdentity {
        Self::model_identity()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(self.api_key.expose())
            .header("User-Agent", crate::USER_AGENT)
            .json(&EmbeddingRequest {
                model: MODEL,
                input: texts,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let api_error = serde_json::from_str::<ErrorEnvelope>(&text)
                .ok()
                .and_then(|e| e.error);
            let classified = classify_error(status.as_u16(), api_error.as_ref(), &text);
            warn!(error = %classified, "OpenAI embeddings error");
            return Err(classified);
        }

        let mut body: EmbeddingResponse = response.json().await?;
        if body.data.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                got: body.data.len(),
            });
        }
        body.data.sort_by_key(|d| d.index);
        debug!(count = texts.len(), "OpenAI embeddings complete");
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

fn classify_error(status: u16, err: Option<&ApiError>, raw: &str) -> EmbeddingError {
    let message = err
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| {
            let end = raw.floor_char_boundary(200);
            format!("HTTP {status}: {}", &raw[..end])
        });
    let quota = err.is_some_and(|e| {
        e.code.as_deref() == Some("insufficient_quota")
            || e.kind.as_deref() == Some("insufficient_quota")
    });

    match status {
        _ if quota => EmbeddingError::QuotaExhausted(message),
        429 => EmbeddingError::RateLimited,
        code => EmbeddingError::Api { code, message },
    }
}
