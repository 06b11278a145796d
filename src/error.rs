//! Error types.
//! `TranslateError` never leaves the batch translator: every variant degrades
//! to fallback text there. `AppError` is what handlers surface to callers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::utc_timestamp;

/// Failure of a single upstream translation call.
#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("translation API key not configured")]
    MissingApiKey,

    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("expected {expected} translations, got {got}")]
    CountMismatch { expected: usize, got: usize },
}

impl TranslateError {
    /// Whether another attempt with a different request encoding can help.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TranslateError::MissingApiKey)
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("invalid language code: {0:?}")]
    InvalidLanguage(String),

    #[error("{0}")]
    Internal(String),
}

/// Failure before the server starts accepting requests.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Source(#[from] crate::source::SourceError),

    #[error("failed to build translation client: {0}")]
    Client(#[from] TranslateError),

    #[error("server IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidLanguage(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn category(&self) -> &'static str {
        match self {
            AppError::InvalidLanguage(_) => "Invalid language",
            AppError::Internal(_) => "Translation failed",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": self.category(),
            "message": self.to_string(),
            "timestamp": utc_timestamp(),
        });

        (status, Json(body)).into_response()
    }
}
