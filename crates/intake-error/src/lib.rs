use axum::{
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Detail returned to callers whose submitter is already on file
pub const DUPLICATE_DETAIL: &str = "User already exists";
/// Detail returned to throttled callers
pub const RATE_LIMITED_DETAIL: &str = "Too many requests";

/// Application error type
///
/// Client-correctable failures (validation, duplicates, throttling) carry the
/// message shown to the caller. Infrastructure failures keep the source error
/// for logs and render a generic detail, except publish failures whose detail
/// is surfaced so the form front-end can tell the queue is down.
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Caller Errors =====
    #[error("Validation error: {0}")]
    Validation(String),

    /// Submitter already known; informational, no notification is sent
    #[error("Duplicate submitter")]
    Duplicate,

    #[error("Rate limit exceeded")]
    TooManyRequests,

    // ===== Downstream Errors =====
    #[error("Publish failed: {0}")]
    Publish(String),

    // ===== Database & Storage Errors =====
    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ===== Internal Errors =====
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Duplicate => StatusCode::BAD_REQUEST,
            AppError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the message placed in the response `detail` field
    pub fn detail(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Duplicate => DUPLICATE_DETAIL.to_string(),
            AppError::TooManyRequests => RATE_LIMITED_DETAIL.to_string(),
            AppError::Publish(msg) => msg.clone(),
            _ => "Internal server error".to_string(),
        }
    }

    /// Get error code for programmatic error handling
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Duplicate => "DUPLICATE_IDENTITY",
            AppError::TooManyRequests => "RATE_LIMIT_EXCEEDED",
            AppError::Publish(_) => "PUBLISH_ERROR",
            #[cfg(feature = "database")]
            AppError::Database(_) => "DATABASE_ERROR",
            #[cfg(feature = "redis")]
            AppError::Redis(_) => "REDIS_ERROR",
            AppError::Json(_) => "JSON_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Log this error with appropriate level and context
    pub fn log(&self) {
        let status = self.status_code();
        let code = self.error_code();

        if status.is_server_error() {
            tracing::error!(
                error = %self,
                error_code = %code,
                status = %status.as_u16(),
                "Server error occurred"
            );
        } else {
            tracing::debug!(
                error = %self,
                error_code = %code,
                status = %status.as_u16(),
                "Client error occurred"
            );
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        self.log();

        let status = self.status_code();
        let body = json!({ "detail": self.detail() });

        if matches!(self, AppError::TooManyRequests) {
            return (status, [(header::RETRY_AFTER, "1")], axum::Json(body)).into_response();
        }

        (status, axum::Json(body)).into_response()
    }
}

// ============================================================================
// Helper functions for creating common errors
// ============================================================================

impl AppError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// Create a publish error
    pub fn publish(msg: impl Into<String>) -> Self {
        AppError::Publish(msg.into())
    }

    /// Create an internal server error
    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}
