use serde::{Deserialize, Serialize};

/// Body for both `/language/translate/v2` and `/language/translate/v2/detect`.
#[derive(Debug, Serialize)]
pub struct TranslateRequest<'a> {
    pub q: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct DetectResponse {
    pub data: Option<DetectData>,
    pub error: Option<ApiError>,
}

/// One inner list per input string; the first element is the best guess.
#[derive(Debug, Deserialize)]
pub struct DetectData {
    pub detections: Vec<Vec<Detection>>,
}

#[derive(Debug, Deserialize)]
pub struct Detection {
    pub language: String,
    pub confidence: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct TranslateResponse {
    pub data: Option<TranslateData>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct TranslateData {
    pub translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub translated_text: String,
    pub detected_source_language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub code: Option<u16>,
    pub message: Option<String>,
}

/// Error envelope used when only the `error` field matters.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: Option<ApiError>,
}
