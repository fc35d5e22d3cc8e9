use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::types::{
    ApiError, DetectResponse, ErrorEnvelope, TranslateRequest, TranslateResponse,
};
use super::{TranslateError, TranslationBackend};
use crate::config::{Config, Secret};

const API_BASE: &str = "https://translation.googleapis.com/language/translate/v2";

#[derive(Debug, Clone)]
enum Auth {
    ApiKey(Secret),
    Bearer(Secret),
    None,
}

/// Google Cloud Translation v2 REST client.
///
/// Auth: `GOOGLE_TRANSLATE_API_KEY` as the `key` query parameter when present,
/// otherwise the shared Google bearer token.
#[derive(Debug, Clone)]
pub struct GoogleTranslateClient {
    http: Client,
    auth: Auth,
    base_url: String,
}

impl GoogleTranslateClient {
    pub fn from_config(http: Client, config: &Config) -> Self {
        let auth = match (&config.translate_api_key, &config.access_token) {
            (Some(key), _) => Auth::ApiKey(key.clone()),
            (None, Some(token)) => Auth::Bearer(token.clone()),
            (None, None) => {
                warn!("no Translation API credentials found; requests will be unauthenticated");
                Auth::None
            }
        };
        Self {
            http,
            auth,
            base_url: API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str, api_key: Option<&str>) -> Self {
        Self {
            http,
            auth: api_key
                .map(|k| Auth::ApiKey(Secret::new(k)))
                .unwrap_or(Auth::None),
            base_url: base_url.to_string(),
        }
    }

    fn endpoint(&self, suffix: &str) -> Result<url::Url, TranslateError> {
        let mut url = url::Url::parse(&format!("{}{suffix}", self.base_url))?;
        if let Auth::ApiKey(key) = &self.auth {
            url.query_pairs_mut().append_pair("key", key.expose());
        }
        Ok(url)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        suffix: &str,
        body: &TranslateRequest<'_>,
    ) -> Result<T, TranslateError> {
        let url = self.endpoint(suffix)?;
        let mut request = self
            .http
            .post(url)
            .header("User-Agent", crate::USER_AGENT)
            .json(body);
        if let Auth::Bearer(token) = &self.auth {
            request = request.bearer_auth(token.expose());
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&text)
            && let Some(err) = &envelope.error
        {
            let classified = classify_api_error(err, status.as_u16());
            warn!(error = %classified, "Translation API error");
            return Err(classified);
        }
        let snippet = if text.len() > 200 {
            &text[..text.floor_char_boundary(200)]
        } else {
            &text
        };
        warn!(status = %status, "Translation API error (no structured body)");
        Err(TranslateError::Api {
            code: status.as_u16(),
            message: format!("HTTP {status}: {snippet}"),
        })
    }
}

impl TranslationBackend for GoogleTranslateClient {
    async fn detect_language(&self, text: &str) -> Result<Option<String>, TranslateError> {
        let body = TranslateRequest {
            q: text,
            target: None,
            format: None,
        };
        let response: DetectResponse = self.post("/detect", &body).await?;
        if let Some(err) = &response.error {
            return Err(classify_api_error(err, 200));
        }

        let best = response
            .data
            .and_then(|d| d.detections.into_iter().next())
            .and_then(|candidates| candidates.into_iter().next())
            .filter(|d| !d.language.is_empty());

        if let Some(detection) = &best {
            debug!(
                language = %detection.language,
                confidence = detection.confidence.unwrap_or_default(),
                "language detected"
            );
        }
        Ok(best.map(|d| d.language))
    }

    async fn translate(&self, text: &str, target: &str) -> Result<String, TranslateError> {
        let body = TranslateRequest {
            q: text,
            target: Some(target),
            format: Some("text"),
        };
        let response: TranslateResponse = self.post("", &body).await?;
        if let Some(err) = &response.error {
            return Err(classify_api_error(err, 200));
        }

        let translation = response
            .data
            .and_then(|d| d.translations.into_iter().next())
            .ok_or_else(|| TranslateError::Api {
                code: 200,
                message: "response contained no translations".to_string(),
            })?;
        debug!(
            to = target,
            source = translation.detected_source_language.as_deref().unwrap_or("?"),
            "text translated"
        );
        Ok(translation.translated_text)
    }
}

fn classify_api_error(err: &ApiError, status: u16) -> TranslateError {
    let message = err
        .message
        .clone()
        .unwrap_or_else(|| "Unknown error".to_string());

    match err.code.unwrap_or(status) {
        429 => TranslateError::RateLimited,
        code => TranslateError::Api { code, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_429_as_rate_limited() {
        let err = ApiError {
            code: Some(429),
            message: Some("User Rate Limit Exceeded".into()),
        };
        assert!(matches!(
            classify_api_error(&err, 429),
            TranslateError::RateLimited
        ));
    }

    #[test]
    fn classify_uses_http_status_when_body_has_no_code() {
        let err = ApiError {
            code: None,
            message: Some("Bad Request".into()),
        };
        match classify_api_error(&err, 400) {
            TranslateError::Api { code, message } => {
                assert_eq!(code, 400);
                assert_eq!(message, "Bad Request");
            }
            other => panic!("expected Api error, got: {other:?}"),
        }
    }

    #[test]
    fn api_key_is_sent_as_query_parameter() {
        let client =
            GoogleTranslateClient::with_base_url(Client::new(), "http://localhost:1/v2", Some("k1"));
        let url = client.endpoint("/detect").unwrap();
        assert_eq!(url.path(), "/v2/detect");
        assert_eq!(url.query(), Some("key=k1"));
    }
}
