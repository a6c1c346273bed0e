//! Row store error types.

use std::time::Duration;

use thiserror::Error;

/// Result type for row store operations.
pub type SheetsResult<T> = Result<T, SheetsError>;

/// Errors that can occur while reading or writing the sheet.
#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Range not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Per-minute quota exhausted. `retry_after` comes from the
    /// `Retry-After` header when the API sends one.
    #[error("Rate limited: {message}")]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },

    #[error("Server error {0}: {1}")]
    ServerError(u16, String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl SheetsError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Map a failed API response to an error.
    pub fn from_response(status: u16, retry_after: Option<Duration>, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        match status {
            401 => Self::AuthError(msg),
            403 => Self::PermissionDenied(msg),
            404 => Self::NotFound(msg),
            429 => Self::RateLimited {
                retry_after,
                message: msg,
            },
            500..=599 => Self::ServerError(status, msg),
            _ => Self::RequestFailed(msg),
        }
    }

    /// HTTP status associated with this error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            SheetsError::AuthError(_) => Some(401),
            SheetsError::PermissionDenied(_) => Some(403),
            SheetsError::NotFound(_) => Some(404),
            SheetsError::RateLimited { .. } => Some(429),
            SheetsError::ServerError(status, _) => Some(*status),
            SheetsError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Wait the API asked for before the next call.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SheetsError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Transient failures: network, quota and 5xx.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SheetsError::Network(_) | SheetsError::RateLimited { .. } | SheetsError::ServerError(_, _)
        )
    }
}
