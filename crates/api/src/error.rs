//! API error types and handling

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use blogdesk_shared::LookupError;
use serde_json::json;

use crate::routing::PublicUrlError;

/// Seconds a client should wait before retrying after a directory outage
pub const RETRY_AFTER_SECS: u64 = 5;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Authentication errors
    #[error("Authentication required")]
    Unauthorized,
    #[error("Insufficient permissions")]
    Forbidden,

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),

    // Resource errors
    #[error("Resource not found")]
    NotFound,
    #[error("Endpoint disabled")]
    Disabled,

    // Upstream errors
    #[error("Tenant directory unavailable")]
    DirectoryUnavailable,

    // Internal errors
    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // Authentication
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", self.to_string()),

            // Validation
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),

            // Resources
            ApiError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            ApiError::Disabled => (StatusCode::NOT_FOUND, "DISABLED", self.to_string()),

            // Upstream
            ApiError::DirectoryUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "DIRECTORY_UNAVAILABLE",
                "Tenant directory unavailable, please retry".to_string(),
            ),

            // Internal
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", self.to_string()),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        let mut response = (status, body).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(RETRY_AFTER_SECS));
        }
        response
    }
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::Transport(_) => {
                tracing::warn!(error = %err, "Tenant directory unreachable");
                ApiError::DirectoryUnavailable
            }
            LookupError::Rejected(_) | LookupError::Decode(_) => {
                tracing::error!(error = %err, "Tenant directory error");
                ApiError::Internal
            }
        }
    }
}

impl From<PublicUrlError> for ApiError {
    fn from(err: PublicUrlError) -> Self {
        match err {
            PublicUrlError::EmptyLabel | PublicUrlError::InvalidLabel(_) => {
                ApiError::Validation(err.to_string())
            }
            PublicUrlError::InvalidOrigin(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
