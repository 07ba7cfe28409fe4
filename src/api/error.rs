//! API Error Types
//!
//! Maps storage, drawer, form and hub errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::drawer::{DrawerError, FormError};
use crate::refresh::HubError;
use crate::storage::StorageError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or unknown caller identity
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller lacks the required role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found or not visible to the caller
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Storage(StorageError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Service unavailable (dependency down)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn bad_request(message: &str) -> Self {
        ApiError::Validation(message.to_string())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            StorageError::Conflict(msg) => ApiError::Conflict(msg),
            StorageError::InvalidReference(msg) | StorageError::InvalidValue(msg) => {
                ApiError::Validation(msg)
            }
            other => ApiError::Storage(other),
        }
    }
}

impl From<FormError> for ApiError {
    fn from(err: FormError) -> Self {
        match err {
            FormError::InvalidPattern(_) => ApiError::Internal(err.to_string()),
            other => ApiError::Validation(other.to_string()),
        }
    }
}

impl From<DrawerError> for ApiError {
    fn from(err: DrawerError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        match err {
            HubError::TooManyConnections { .. } => ApiError::ServiceUnavailable(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "API error occurred"
            );
        } else {
            tracing::warn!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "Request rejected"
            );
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
