/// Unified error types for the libris service
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum LibrisError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Bad credentials or a bad/expired signed token. Token failures are
    /// collapsed into this variant so callers cannot probe which part of
    /// a token was wrong.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Unauthenticated access to a session-gated route
    #[error("Authentication required")]
    Unauthorized,

    /// Authenticated but not the owner of the target record
    #[error("Not allowed: {0}")]
    Forbidden(String),

    /// Login attempted before the account's email was verified
    #[error("Email not verified: {0}")]
    Unverified(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Duplicate email/username
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unknown account or record
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: std::time::Duration },

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Structured error body: `{status, message, error}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub message: String,
    pub error: String,
}

/// Convert LibrisError to an HTTP response
impl IntoResponse for LibrisError {
    fn into_response(self) -> Response {
        // Unauthenticated browsers get sent to the login page, not a
        // structured error.
        if matches!(self, LibrisError::Unauthorized) {
            return Redirect::to("/login").into_response();
        }

        // The body carries the bare message, not the Display rendering,
        // so clients see "Password incorrect" rather than
        // "Authentication failed: Password incorrect".
        let (status, error_code, message) = match &self {
            LibrisError::Authentication(msg) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationFailed",
                msg.clone(),
            ),
            LibrisError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, "Forbidden", msg.clone())
            }
            LibrisError::Unverified(msg) => (
                StatusCode::FORBIDDEN,
                "EmailNotVerified",
                msg.clone(),
            ),
            LibrisError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "ValidationError",
                msg.clone(),
            ),
            LibrisError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, "NotFound", msg.clone())
            }
            LibrisError::Conflict(msg) => {
                (StatusCode::CONFLICT, "Conflict", msg.clone())
            }
            LibrisError::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RateLimitExceeded",
                "Rate limit exceeded".to_string(),
            ),
            LibrisError::Database(_) | LibrisError::Internal(_) | LibrisError::Io(_) => {
                tracing::error!("Internal failure: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalServerError",
                    "Internal server error".to_string(), // Don't leak details
                )
            }
            LibrisError::Unauthorized => unreachable!("redirected above"),
        };

        let body = Json(ErrorResponse {
            status: status.as_u16(),
            message,
            error: error_code.to_string(),
        });

        if let LibrisError::RateLimited { retry_after } = &self {
            let headers = [(header::RETRY_AFTER, retry_after.as_secs().to_string())];
            return (status, headers, body).into_response();
        }

        (status, body).into_response()
    }
}

/// Result type alias for service operations
pub type LibrisResult<T> = Result<T, LibrisError>;
