//! Error types for hura-api

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// hura-api error type; every variant renders as `{"detail": ...}`
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    Processing(String),

    #[error("Too many requests. Please try again later.")]
    RateLimited,

    #[error("{0}")]
    Forbidden(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl From<hura_core::Error> for ApiError {
    fn from(err: hura_core::Error) -> Self {
        match err {
            hura_core::Error::ServiceUnavailable(msg) => ApiError::ServiceUnavailable(msg),
            other => {
                tracing::error!("Request processing failed: {}", other);
                ApiError::Processing("Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;
