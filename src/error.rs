// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::processing::ProcessingError;
use crate::storage::StorageError;
use crate::store::StoreError;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., duplicate username)
    Conflict(String),

    /// A generation-pipeline failure. Carries the tagged error so the
    /// response can expose a machine-readable `kind` alongside the message
    /// and clients can branch (prompt re-upload vs offer retry).
    Pipeline(ProcessingError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, kind) = match self {
            AppError::Pipeline(err) => {
                let status = match &err {
                    ProcessingError::AlreadyProcessing { .. } => StatusCode::CONFLICT,
                    ProcessingError::CacheMiss(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    ProcessingError::Generation(_) => StatusCode::BAD_GATEWAY,
                    ProcessingError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string(), Some(err.kind()))
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                    None,
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
        };

        let body = match kind {
            Some(kind) => Json(json!({
                "error": error_message,
                "kind": kind,
            })),
            None => Json(json!({
                "error": error_message,
            })),
        };

        (status, body).into_response()
    }
}

/// Store failures outside the pipeline map straight onto HTTP statuses;
/// unique violations become conflicts so handlers can add context first if
/// they want a friendlier message.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(msg) => AppError::Conflict(msg),
            StoreError::Database(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<ProcessingError> for AppError {
    fn from(err: ProcessingError) -> Self {
        AppError::Pipeline(err)
    }
}
