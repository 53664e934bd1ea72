//! Error types for the Monitor360 SDK

use crate::auth::AuthError;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Main error type for SDK operations
#[derive(Debug, Error)]
pub enum ApiError {
    /// Configuration error (fatal at construction)
    #[error("Configuration error: {0}")]
    Config(#[from] monitor360_common::ConfigurationError),

    /// Session synchronisation error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Transport-level failure, passed through unchanged
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// The server rejected the credential (or its absence)
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Service temporarily unavailable")]
    ServiceUnavailable,

    #[error("Internal server error: {message}")]
    Internal { message: String },

    /// The request could not be built
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;

/// Error body returned by the backend (`{"detail": "..."}`)
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub detail: serde_json::Value,
}

impl ErrorResponse {
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl ApiError {
    /// Map an error status and body into an error
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorResponse>(body)
            .map(|error| error.message())
            .unwrap_or_else(|_| {
                if body.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("Request failed")
                        .to_string()
                } else {
                    body.to_string()
                }
            });

        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized { message },
            StatusCode::FORBIDDEN => ApiError::Forbidden { message },
            StatusCode::NOT_FOUND => ApiError::NotFound { resource: message },
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ApiError::BadRequest { message }
            }
            StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimitExceeded,
            StatusCode::SERVICE_UNAVAILABLE => ApiError::ServiceUnavailable,
            _ => ApiError::Internal {
                message: format!("Request failed with status {status}: {message}"),
            },
        }
    }

    /// Get error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Config(_) => "MONITOR360_CONFIG_ERROR",
            ApiError::Auth(AuthError::AuthTimeout { .. }) => "MONITOR360_AUTH_TIMEOUT",
            ApiError::Auth(AuthError::Cancelled) => "MONITOR360_AUTH_CANCELLED",
            ApiError::Auth(_) => "MONITOR360_AUTH_ERROR",
            ApiError::HttpClient(_) => "MONITOR360_HTTP_CLIENT_ERROR",
            ApiError::Unauthorized { .. } => "MONITOR360_UNAUTHORIZED",
            ApiError::Forbidden { .. } => "MONITOR360_FORBIDDEN",
            ApiError::NotFound { .. } => "MONITOR360_NOT_FOUND",
            ApiError::BadRequest { .. } => "MONITOR360_BAD_REQUEST",
            ApiError::RateLimitExceeded => "MONITOR360_RATE_LIMIT",
            ApiError::ServiceUnavailable => "MONITOR360_SERVICE_UNAVAILABLE",
            ApiError::Internal { .. } => "MONITOR360_INTERNAL_ERROR",
            ApiError::InvalidRequest { .. } => "MONITOR360_INVALID_REQUEST",
        }
    }

    /// Whether a caller may reasonably retry. The SDK itself never does.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::HttpClient(e) => e.is_timeout() || e.is_connect(),
            ApiError::ServiceUnavailable | ApiError::RateLimitExceeded => true,
            ApiError::Auth(e) => e.is_recoverable(),
            _ => false,
        }
    }

    /// Check if error is a client error
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized { .. }
                | ApiError::Forbidden { .. }
                | ApiError::NotFound { .. }
                | ApiError::BadRequest { .. }
                | ApiError::RateLimitExceeded
                | ApiError::InvalidRequest { .. }
        )
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }
}
