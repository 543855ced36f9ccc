//! Error types and handling
//!
//! Every failure the console can surface falls into one of the kinds below.
//! Validation errors are raised before any request is sent; API errors carry
//! the server's message verbatim so it can be shown to the operator as-is.

use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Console error types
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Client-side validation failed; no request was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// The admin API rejected the request
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the server, verbatim
        message: String,
    },

    /// Network or transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request exceeded the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Response did not match the expected shape
    #[error("Unexpected response shape: {0}")]
    Schema(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller lacks the capability for this action
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ConsoleError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Short machine-readable identifier for the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ConsoleError::Validation(_) => "validation_error",
            ConsoleError::Api { .. } => "api_error",
            ConsoleError::Transport(_) => "transport_error",
            ConsoleError::Timeout(_) => "timeout",
            ConsoleError::Schema(_) => "schema_error",
            ConsoleError::NotFound(_) => "not_found",
            ConsoleError::Forbidden(_) => "forbidden",
            ConsoleError::Config(_) => "config_error",
        }
    }

    /// Whether the request reached the network at all
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            ConsoleError::Validation(_) | ConsoleError::Forbidden(_) | ConsoleError::Config(_)
        )
    }

    /// Build the notification shown to the operator
    pub fn to_notice(&self) -> ErrorNotice {
        let message = match self {
            ConsoleError::Api { message, .. } => message.clone(),
            ConsoleError::Validation(msg)
            | ConsoleError::Transport(msg)
            | ConsoleError::Timeout(msg)
            | ConsoleError::Schema(msg)
            | ConsoleError::NotFound(msg)
            | ConsoleError::Forbidden(msg)
            | ConsoleError::Config(msg) => msg.clone(),
        };

        if matches!(
            self,
            ConsoleError::Transport(_) | ConsoleError::Schema(_) | ConsoleError::Config(_)
        ) {
            error!(error = %self, error_type = self.kind(), "Console error");
        }

        let notice = ErrorNotice::new(self.kind(), message);
        match self {
            ConsoleError::Api { status, .. } => notice.with_status(*status),
            _ => notice,
        }
    }
}

/// Operator-facing error notification
#[derive(Serialize, Debug)]
pub struct ErrorNotice {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// HTTP status, when the server answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorNotice {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ConsoleError::Timeout(err.to_string())
        } else if err.is_decode() {
            ConsoleError::Schema(err.to_string())
        } else if err.is_connect() {
            ConsoleError::Transport(format!("Failed to connect to admin API: {}", err))
        } else {
            ConsoleError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ConsoleError {
    fn from(err: serde_json::Error) -> Self {
        ConsoleError::Schema(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ConsoleError {
    fn from(err: validator::ValidationErrors) -> Self {
        ConsoleError::Validation(err.to_string())
    }
}

/// Result type alias for console operations
pub type ConsoleResult<T> = Result<T, ConsoleError>;
