//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request body was malformed or failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Request refused before its body could be read as JSON
    /// (too large, wrong content type)
    #[error("Request rejected: {message}")]
    Rejected { status: StatusCode, message: String },

    /// Storage layer error
    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
                ApiError::Validation(rejection.body_text())
            }
            other => ApiError::Rejected {
                status: other.status(),
                message: other.body_text(),
            },
        }
    }
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(reason) => {
                (StatusCode::BAD_REQUEST, format!("Invalid measurement: {}", reason))
            }
            ApiError::Rejected { status, message } => (*status, message.clone()),
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string()),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string()),
        };

        // Details stay in the log; clients only see the fixed message
        let request_id = uuid::Uuid::new_v4();
        if status.is_server_error() {
            tracing::error!(request_id = %request_id, error = %self, "API error occurred");
        } else {
            tracing::warn!(request_id = %request_id, error = %self, "Rejected request");
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
