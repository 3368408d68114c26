use thiserror::Error;

use crate::session::{Exchange, ExchangeId};

/// Opaque failure reported by an external service (translation, TTS, ...)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{service} service error: {message}")]
pub struct ServiceError {
    pub service: String,
    pub message: String,
}

impl ServiceError {
    pub fn new(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            message: message.into(),
        }
    }
}

/// Failure kinds of the speech recognition service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    #[error("No speech detected in the audio sample")]
    NoSpeechDetected,

    #[error("Speech could not be understood")]
    Unintelligible,

    #[error("Speech recognition service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Error, Debug)]
pub enum TsuyakuError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Translation failed for exchange {}: {source}", .exchange.id)]
    TranslationFailed {
        exchange: Box<Exchange>,
        source: ServiceError,
    },

    #[error("Speech synthesis failed: {0}")]
    SpeechSynthesisFailed(ServiceError),

    #[error("Exchange not found: {0}")]
    NotFound(ExchangeId),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Recognition(#[from] RecognitionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl TsuyakuError {
    /// Whether repeating the same call could succeed.
    /// Input and configuration errors are never retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidRequest(_) | Self::NotFound(_) | Self::Config(_) => false,
            Self::Toml(_) | Self::Json(_) => false,
            Self::Recognition(RecognitionError::NoSpeechDetected) => false,
            _ => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, TsuyakuError>;
