use std::sync::RwLock;

use reqwest::{Client, Response, StatusCode};
use tracing::{debug, info, warn};

use super::response::extract_text;
use super::types::{
    ApiError, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
};
use crate::config::{Config, ConfigError, Secret, TokenRefresh};

const TEMPERATURE: f32 = 0.4;
const MAX_OUTPUT_TOKENS: u32 = 2048;

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("no Google access token. Set GOOGLE_ACCESS_TOKEN or run `gcloud auth login`.")]
    AccessTokenNotSet,

    #[error("Vertex AI rate limit exceeded")]
    RateLimited,

    #[error("Vertex AI permission denied: {0}")]
    PermissionDenied(String),

    #[error("Vertex AI error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Single-turn text generation with a system instruction.
/// Implemented by `VertexClient`; tests substitute canned models.
pub trait LanguageModel {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, GeminiError>;
}

/// Vertex AI `generateContent` client for Gemini models.
///
/// A token obtained from gcloud expires after about an hour; on a 401 it is
/// fetched again once and the request repeated.
#[derive(Debug)]
pub struct VertexClient {
    http: Client,
    access_token: RwLock<Option<Secret>>,
    refresh: Option<TokenRefresh>,
    model: String,
    endpoint: String,
}

impl VertexClient {
    pub fn from_config(http: Client, config: &Config) -> Result<Self, ConfigError> {
        let project = config.project_id()?;
        let base = format!("https://{}-aiplatform.googleapis.com/v1", config.region);
        if config.access_token.is_none() {
            warn!("no Google access token found; answer generation will fall back to FAQ answers");
        }
        Ok(Self {
            http,
            access_token: RwLock::new(config.access_token.clone()),
            refresh: config.access_token_refresh,
            model: config.gemini_model.clone(),
            endpoint: model_endpoint(&base, project, &config.region, &config.gemini_model),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            access_token: RwLock::new(Some(Secret::new("test-token"))),
            refresh: None,
            model: crate::config::DEFAULT_GEMINI_MODEL.to_string(),
            endpoint: model_endpoint(
                base_url,
                "test-project",
                "us-central1",
                crate::config::DEFAULT_GEMINI_MODEL,
            ),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_token_refresh(mut self, refresh: TokenRefresh) -> Self {
        self.refresh = Some(refresh);
        self
    }

    fn current_token(&self) -> Option<Secret> {
        self.access_token.read().ok().and_then(|t| t.clone())
    }

    async fn send(
        &self,
        token: &Secret,
        request: &GenerateContentRequest,
    ) -> Result<Response, reqwest::Error> {
        self.http
            .post(&self.endpoint)
            .bearer_auth(token.expose())
            .header("User-Agent", crate::USER_AGENT)
            .json(request)
            .send()
            .await
    }

    /// Fetches a new token and stores it for later calls.
    fn refresh_token(&self) -> Option<Secret> {
        let fresh = (self.refresh?)()?;
        if let Ok(mut slot) = self.access_token.write() {
            *slot = Some(fresh.clone());
        }
        info!("Google access token refreshed");
        Some(fresh)
    }
}

fn model_endpoint(base: &str, project: &str, region: &str, model: &str) -> String {
    format!(
        "{base}/projects/{project}/locations/{region}/publishers/google/models/{model}:generateContent"
    )
}

impl LanguageModel for VertexClient {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, GeminiError> {
        let token = self.current_token().ok_or(GeminiError::AccessTokenNotSet)?;

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
                role: Some("user".to_string()),
            }],
            system_instruction: Content {
                parts: vec![Part {
                    text: system.to_string(),
                }],
                role: None,
            },
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        debug_assert!(
            self.endpoint.starts_with("https://") || cfg!(test),
            "access token must only be sent over HTTPS"
        );

        let mut response = self.send(&token, &request).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("Vertex AI rejected the access token");
            if let Some(fresh) = self.refresh_token() {
                response = self.send(&fresh, &request).await?;
            }
        }

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Vertex AI rate limited");
            return Err(GeminiError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if let Ok(body) = serde_json::from_str::<GenerateContentResponse>(&text)
                && let Some(err) = &body.error
            {
                let classified = classify_api_error(err);
                warn!(error = %classified, "Vertex AI error");
                return Err(classified);
            }
            let snippet = &text[..text.floor_char_boundary(200)];
            warn!(status = %status, "Vertex AI error (no structured body)");
            return Err(GeminiError::Api {
                code: status.as_u16(),
                message: format!("HTTP {status}: {snippet}"),
            });
        }

        let body: GenerateContentResponse = response.json().await?;
        if let Some(err) = &body.error {
            let classified = classify_api_error(err);
            warn!(error = %classified, "Vertex AI error in 200 response");
            return Err(classified);
        }

        debug!(model = %self.model, "generation complete");
        Ok(extract_text(&body))
    }
}

fn classify_api_error(err: &ApiError) -> GeminiError {
    let message = err
        .message
        .clone()
        .unwrap_or_else(|| "Unknown error".to_string());

    match (err.code, err.status.as_deref()) {
        (Some(429), _) | (_, Some("RESOURCE_EXHAUSTED")) => GeminiError::RateLimited,
        (Some(403), _) | (_, Some("PERMISSION_DENIED")) => GeminiError::PermissionDenied(message),
        (Some(code), _) => GeminiError::Api { code, message },
        (None, _) => GeminiError::Api {
            code: 0,
            message: format!("Unknown error (no status code): {message}"),
        },
    }
}
