//! Error types for diskgate-core

use crate::response::FailureKind;
use diskgate_transfer::TransferError;
use thiserror::Error;

/// Core error types for the gateway
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed request parameter
    #[error("{0}")]
    Validation(String),

    /// Connection, timeout or protocol failure talking to a server
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success answer from the storage provider
    #[error("HTTP {status}: {message}")]
    Provider { status: u16, message: String },

    /// The provider answered 2xx but without a field we need
    #[error("Unexpected provider response: {0}")]
    Protocol(String),

    /// No working link could be obtained from the provider
    #[error("{0}")]
    Unavailable(String),

    /// Streaming source or sink failure
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// The upload source could not be used
    #[error("{0}")]
    Source(String),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration-related error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Failure class reported on the gateway result
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Validation(_) => FailureKind::Validation,
            Error::Transport(_) => FailureKind::Transport,
            Error::Provider { .. } | Error::Protocol(_) | Error::Unavailable(_) => {
                FailureKind::Provider
            }
            Error::Transfer(_) | Error::Source(_) | Error::Io(_) => FailureKind::Transfer,
            Error::Json(_) | Error::Config(_) => FailureKind::Internal,
        }
    }

    /// Message shown to the caller
    pub fn user_message(&self) -> String {
        match self {
            Error::Transport(e) if e.is_timeout() => format!("Request timed out: {}", e),
            Error::Transport(e) if e.is_connect() => format!("Connection error: {}", e),
            other => other.to_string(),
        }
    }

    /// Prefix the message of a provider error, keeping its status
    pub fn context(self, prefix: &str) -> Self {
        match self {
            Error::Provider { status, message } => Error::Provider {
                status,
                message: format!("{}: {}", prefix, message),
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let err = Error::Provider {
            status: 404,
            message: "Resource not found.".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404: Resource not found.");
        assert_eq!(err.kind(), FailureKind::Provider);
    }

    #[test]
    fn test_context_keeps_status() {
        let err = Error::Provider {
            status: 404,
            message: "Resource not found.".to_string(),
        }
        .context("File not found");
        assert_eq!(err.to_string(), "HTTP 404: File not found: Resource not found.");

        let err = Error::Validation("bad".to_string()).context("ignored");
        assert_eq!(err.to_string(), "bad");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Error::Validation("x".into()).kind(), FailureKind::Validation);
        assert_eq!(Error::Source("x".into()).kind(), FailureKind::Transfer);
        assert_eq!(Error::Config("x".into()).kind(), FailureKind::Internal);
    }
}
