use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::services::{
    artifact_store::ArtifactError, auth::AuthError, convert::ConvertError,
    registry::RegistryError, upload::UploadError,
};

/// Client-facing message for every unlock failure.
pub const INCORRECT_PASSWORD: &str = "Incorrect password or failed to unlock";

const AUTH_FAILED: &str = "Auth failed";

/// A lightweight wrapper for request errors that keeps the message local.
///
/// Every failure leaving a handler ends up here and is rendered as a flat
/// `{"message": ..., "status": ...}` object.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn payload_too_large(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, msg)
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "message": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("unhandled error: {:#}", err);
        AppError::internal("Internal server error")
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("database error: {}", err);
        AppError::internal("Database error")
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::InvalidFileType(mime) => {
                tracing::debug!("rejected upload with type {}", mime);
                AppError::bad_request("Invalid file type.")
            }
            UploadError::FileTooLarge { limit } => {
                tracing::debug!("rejected upload larger than {} bytes", limit);
                AppError::payload_too_large("File too large")
            }
            UploadError::UnexpectedField(_) | UploadError::TooManyFiles => {
                AppError::bad_request(err.to_string())
            }
            UploadError::Multipart(err) => AppError::new(err.status(), err.body_text()),
            UploadError::Io(err) => {
                tracing::error!("failed to store upload: {}", err);
                AppError::internal("Failed to process file")
            }
        }
    }
}

impl From<ConvertError> for AppError {
    fn from(err: ConvertError) -> Self {
        match err {
            ConvertError::InvalidInput(message) => AppError::bad_request(message),
            ConvertError::IncorrectPassword(detail) => {
                tracing::debug!("unlock failed: {}", detail);
                AppError::bad_request(INCORRECT_PASSWORD)
            }
            ConvertError::CorruptPdf(detail) => {
                tracing::error!("corrupted PDF: {}", detail);
                AppError::internal("The PDF file structure is invalid or corrupted.")
            }
            other => {
                tracing::error!("conversion failed: {}", other);
                AppError::internal("Failed to process file")
            }
        }
    }
}

impl From<ArtifactError> for AppError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::NotFound(_) | ArtifactError::InvalidName => {
                AppError::not_found("File not found")
            }
            ArtifactError::Sqlx(err) => err.into(),
            ArtifactError::Io(err) => {
                tracing::error!("artifact storage error: {}", err);
                AppError::internal("Failed to process file")
            }
        }
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::ToolNotFound(_) => AppError::not_found("Tool not found"),
            RegistryError::InvalidUpdate(message) => AppError::bad_request(message),
            RegistryError::SettingsMissing => AppError::not_found("Settings not found"),
            RegistryError::Sqlx(err) => err.into(),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::BadCredentials | AuthError::MissingToken | AuthError::InvalidToken(_) => {
                AppError::unauthorized(AUTH_FAILED)
            }
            AuthError::Sqlx(err) => err.into(),
            other => {
                tracing::error!("authentication error: {}", other);
                AppError::internal("Internal server error")
            }
        }
    }
}
