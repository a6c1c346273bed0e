//! Worker error types.

use shortgen_sheets::SheetsError;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Generation failed after {attempts} attempt(s){}: {message}", status_suffix(.status))]
    Generation {
        status: Option<u16>,
        message: String,
        attempts: u32,
    },

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("AI request failed: {0}")]
    AiFailed(String),

    #[error("No work found: {0}")]
    NoWorkFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Store error: {0}")]
    Store(#[from] SheetsError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl WorkerError {
    pub fn generation(status: Option<u16>, message: impl Into<String>, attempts: u32) -> Self {
        Self::Generation {
            status,
            message: message.into(),
            attempts,
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    pub fn ai_failed(msg: impl Into<String>) -> Self {
        Self::AiFailed(msg.into())
    }

    pub fn no_work_found(msg: impl Into<String>) -> Self {
        Self::NoWorkFound(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Check if the whole generate+write step may be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Generation { .. }
            | WorkerError::MalformedResponse(_)
            | WorkerError::AiFailed(_)
            | WorkerError::Http(_) => true,
            WorkerError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_display() {
        let err = WorkerError::generation(Some(429), "quota exhausted", 5);
        assert_eq!(
            err.to_string(),
            "Generation failed after 5 attempt(s) (HTTP 429): quota exhausted"
        );

        let err = WorkerError::generation(None, "connection refused", 1);
        assert_eq!(
            err.to_string(),
            "Generation failed after 1 attempt(s): connection refused"
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(WorkerError::generation(Some(500), "x", 1).is_retryable());
        assert!(WorkerError::malformed("no text").is_retryable());
        assert!(WorkerError::Store(SheetsError::ServerError(503, "x".into())).is_retryable());
        assert!(!WorkerError::Store(SheetsError::PermissionDenied("x".into())).is_retryable());
        assert!(!WorkerError::no_work_found("empty").is_retryable());
        assert!(!WorkerError::config_error("missing key").is_retryable());
    }
}
