//! API error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use mysql_backup_core::CoreError;

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// A failed backup run, with the progress recorded before it failed
    #[error("Backup failed: {error}")]
    Backup { error: CoreError, log: String },
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            ApiError::Backup { error, .. } => match error {
                CoreError::Connection(_) => (StatusCode::BAD_GATEWAY, error.kind()),
                CoreError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, error.kind()),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, error.kind()),
            },
        };

        let message = self.to_string();
        let log = match self {
            ApiError::Backup { log, .. } => Some(log),
            _ => None,
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            log,
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
