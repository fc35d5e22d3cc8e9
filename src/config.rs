use std::env;
use std::path::PathBuf;

use tracing::debug;

const DEFAULT_REGION: &str = "us-central1";
const DEFAULT_FAQ_PATH: &str = "faqs.json";
const DEFAULT_INDEX_DIR: &str = "faq_index";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("GCP_PROJECT_ID not found. Set it in the environment or a .env file.")]
    MissingProjectId,
}

/// Credential string that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Process-wide settings, read once at startup.
///
/// Environment variables:
/// - `GCP_PROJECT_ID`: Vertex AI project (required before any query)
/// - `GCP_REGION`: Vertex AI location (default `us-central1`)
/// - `GEMINI_MODEL`: generation model (default `gemini-2.5-flash`)
/// - `GOOGLE_TRANSLATE_API_KEY`: Translation API key (optional)
/// - `GOOGLE_ACCESS_TOKEN` / `gcloud auth print-access-token`: bearer token for Google APIs
/// - `OPENAI_API_KEY` + `USE_OPENAI_EMBEDDINGS=true`: paid embeddings (optional)
/// - `FAQ_PATH`, `INDEX_DIR`: data locations
/// - `MODEL_CACHE_DIR`: where the local embedding model is downloaded
#[derive(Debug, Clone)]
pub struct Config {
    project_id: Option<String>,
    pub region: String,
    pub gemini_model: String,
    pub translate_api_key: Option<Secret>,
    pub access_token: Option<Secret>,
    /// Set when the access token came from gcloud and can be fetched again.
    pub access_token_refresh: Option<TokenRefresh>,
    pub openai_api_key: Option<Secret>,
    pub use_openai_embeddings: bool,
    pub faq_path: PathBuf,
    pub index_dir: PathBuf,
    pub model_cache_dir: Option<PathBuf>,
}

/// Fetches a fresh bearer token after the current one was rejected.
pub type TokenRefresh = fn() -> Option<Secret>;

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::from_lookup(|key| env::var(key).ok());
        if config.access_token.is_none() {
            config.access_token = gcloud_access_token();
            if config.access_token.is_some() {
                config.access_token_refresh = Some(gcloud_access_token);
            }
        }
        config
    }

    /// Builds the configuration from an arbitrary variable source.
    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            project_id: get("GCP_PROJECT_ID"),
            region: get("GCP_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            translate_api_key: get("GOOGLE_TRANSLATE_API_KEY").map(Secret::new),
            access_token: get("GOOGLE_ACCESS_TOKEN").map(Secret::new),
            access_token_refresh: None,
            openai_api_key: get("OPENAI_API_KEY").map(Secret::new),
            use_openai_embeddings: get("USE_OPENAI_EMBEDDINGS")
                .is_some_and(|v| v.eq_ignore_ascii_case("true")),
            faq_path: get("FAQ_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FAQ_PATH)),
            index_dir: get("INDEX_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX_DIR)),
            model_cache_dir: get("MODEL_CACHE_DIR").map(PathBuf::from),
        }
    }

    /// The Vertex AI project. Its absence blocks every query.
    pub fn project_id(&self) -> Result<&str, ConfigError> {
        self.project_id
            .as_deref()
            .ok_or(ConfigError::MissingProjectId)
    }

    /// Paid embeddings need both a key and the explicit opt-in flag.
    pub fn wants_paid_embeddings(&self) -> bool {
        self.openai_api_key.is_some() && self.use_openai_embeddings
    }
}

fn gcloud_access_token() -> Option<Secret> {
    std::process::Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .ok()
        .filter(|o| {
            if !o.status.success() {
                debug!(
                    stderr = %String::from_utf8_lossy(&o.stderr).trim(),
                    "gcloud auth print-access-token failed"
                );
            }
            o.status.success()
        })
        .and_then(|o| {
            let token = String::from_utf8_lossy(&o.stdout).trim().to_string();
            if token.is_empty() { None } else { Some(Secret::new(token)) }
        })
}
