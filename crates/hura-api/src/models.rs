//! Request and response bodies

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, Result};

pub const MAX_QUESTION_CHARS: usize = 1000;
pub const MAX_TRANSLATION_CHARS: usize = 2000;
pub const MAX_SERVICE_QUERY_CHARS: usize = 500;

/// Trim and drop control characters
pub fn sanitize(value: &str) -> String {
    value.trim().chars().filter(|c| (*c as u32) >= 32).collect()
}

/// Reject empty or over-long input, returning the sanitized text.
/// `field` is the capitalized noun used in error messages.
pub fn validate_text(value: &str, max_chars: usize, field: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{} cannot be empty", field)));
    }
    if value.chars().count() > max_chars {
        return Err(ApiError::Validation(format!(
            "{} too long (max {} characters)",
            field, max_chars
        )));
    }
    Ok(sanitize(value))
}

/// Body of `POST /ask`
#[derive(Debug, Deserialize)]
pub struct Question {
    pub text: String,
}

impl Question {
    pub fn validated(self) -> Result<String> {
        validate_text(&self.text, MAX_QUESTION_CHARS, "Query")
    }
}

/// Body of the translation endpoints
#[derive(Debug, Deserialize)]
pub struct TranslationRequest {
    pub text: String,
}

impl TranslationRequest {
    pub fn validated(self) -> Result<String> {
        validate_text(&self.text, MAX_TRANSLATION_CHARS, "Text")
    }
}

/// Body of `POST /maps` and `POST /weather`
#[derive(Debug, Deserialize)]
pub struct ServiceQuery {
    pub query: String,
}

impl ServiceQuery {
    pub fn validated(self) -> Result<String> {
        validate_text(&self.query, MAX_SERVICE_QUERY_CHARS, "Query")
    }
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub response: String,
    pub processing_time: String,
    pub service_used: Option<String>,
}

/// Elapsed seconds as `"x.xx seconds"`
pub fn processing_time(seconds: f64) -> String {
    format!("{:.2} seconds", seconds)
}

#[derive(Debug, Serialize)]
pub struct TranslationResponse {
    pub translation: String,
    pub source_language: String,
    pub target_language: String,
    pub service_used: String,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
    pub endpoints: Value,
    pub documentation: String,
}

#[derive(Debug, Serialize)]
pub struct MenuOption {
    pub id: String,
    pub title: String,
    pub description: String,
    pub endpoint: String,
    pub method: String,
    pub example: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureStatus {
    pub rag: bool,
    pub translation: bool,
    pub maps: bool,
    pub weather: bool,
    pub whatsapp: bool,
}

#[derive(Debug, Serialize)]
pub struct MenuResponse {
    pub title: String,
    pub description: String,
    pub options: Vec<MenuOption>,
    pub features_status: FeatureStatus,
}

#[derive(Debug, Serialize)]
pub struct HealthDetails {
    pub rag_service: bool,
    pub translation_service: bool,
    pub maps_service: bool,
    pub weather_service: bool,
    pub whatsapp_service: bool,
    pub active_whatsapp_sessions: usize,
    pub persistent_storage: String,
    pub storage_usage: String,
    pub features: FeatureStatus,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub details: HealthDetails,
}
