//! Custom error types for client operations

use std::fmt;
use thiserror::Error;

/// Optional provider error code, rendered as `[code] ` when present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamCode(pub Option<String>);

impl fmt::Display for UpstreamCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(code) => write!(f, "[{}] ", code),
            None => Ok(()),
        }
    }
}

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// The provider answered with a structured error payload
    #[error("{code}{message}")]
    Upstream {
        /// Provider error code, if any
        code: UpstreamCode,
        /// Provider error message
        message: String,
    },

    /// The provider answered with a non-retryable status
    #[error("[{status}] {body}")]
    UpstreamStatus {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// A bounded retry policy gave up
    #[error("Gave up after {attempts} attempts: {last_condition}")]
    RetriesExhausted {
        /// Requests issued, including the first
        attempts: u32,
        /// Condition seen on the last attempt
        last_condition: String,
    },

    /// Network error
    #[error("Network error: {message}")]
    NetworkError {
        /// Transport failure description
        message: String,
    },

    /// Invalid response from API
    #[error("Invalid response: {message}")]
    InvalidResponseError {
        /// What was wrong with the body
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Which setting was rejected
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ClientError {
    /// Build an upstream error from an optional provider code and message
    pub fn upstream(code: Option<String>, message: impl Into<String>) -> Self {
        ClientError::Upstream {
            code: UpstreamCode(code),
            message: message.into(),
        }
    }

    /// Build an invalid response error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        ClientError::InvalidResponseError {
            message: message.into(),
        }
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
