//! Error types for hura-whatsapp

use thiserror::Error;

/// hura-whatsapp error type
#[derive(Error, Debug)]
pub enum WhatsAppError {
    #[error("Twilio credentials not set")]
    CredentialsNotSet,

    #[error("Twilio API error: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for WhatsAppError {
    fn from(err: reqwest::Error) -> Self {
        WhatsAppError::Http(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, WhatsAppError>;
