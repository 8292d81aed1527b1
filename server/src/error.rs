//! Error types for NoteVault
//!
//! All errors use thiserror for structured error handling.
//! HTTP handlers turn them into JSON error bodies via `IntoResponse`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Not allowed")]
    Authorization,

    #[error("Please use a valid user for authentication")]
    Unauthenticated,

    #[error("Version mismatch: version {version_id} does not belong to note {note_id}")]
    VersionMismatch { version_id: String, note_id: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upload store error: {0}")]
    UploadStore(String),

    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// True when the persistence layer rejected a read or write.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Io(_) | AppError::UploadStore(_)
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Authorization | AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::VersionMismatch { .. } | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {}", self);
            "Server error occurred.".to_string()
        } else {
            self.to_string()
        };

        let body = Json(serde_json::json!({ "error": message }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
