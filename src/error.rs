//! Error types for remote-tail
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Only configuration and checkpoint-parse errors are fatal, and only at
//! startup. Everything a transport reports is retried on the next poll.

use thiserror::Error;

/// The main error type for remote-tail
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Checkpoint Errors
    // ============================================================================
    #[error("Invalid checkpoint file '{path}': {message}")]
    InvalidCheckpoint { path: String, message: String },

    #[error("Checkpoint failed: {message}")]
    Checkpoint { message: String },

    // ============================================================================
    // Transport Errors
    // ============================================================================
    #[error("Transport error: {message}")]
    TransportIo { message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Unexpected HTTP status: {status}")]
    UnexpectedStatus { status: u16 },

    #[error("Expected 200, got 206 for a request without a Range header")]
    UnexpectedPartialContent,

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output error: {message}")]
    Output { message: String },
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid checkpoint error
    pub fn invalid_checkpoint(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidCheckpoint {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a checkpoint read/write error
    pub fn checkpoint(message: impl Into<String>) -> Self {
        Self::Checkpoint {
            message: message.into(),
        }
    }

    /// Create a transport I/O error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::TransportIo {
            message: message.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Create an unexpected status error
    pub fn unexpected_status(status: u16) -> Self {
        Self::UnexpectedStatus { status }
    }

    /// Check if this error is retryable on the next poll
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::TransportIo { .. }
            | Error::Http(_)
            | Error::Timeout { .. }
            | Error::UnexpectedStatus { .. }
            | Error::UnexpectedPartialContent
            | Error::Checkpoint { .. }
            | Error::Io(_) => true,
            Error::Config { .. }
            | Error::InvalidUrl(_)
            | Error::InvalidCheckpoint { .. }
            | Error::Output { .. } => false,
        }
    }
}

/// Result type alias for remote-tail
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to transport errors
pub trait ResultExt<T> {
    /// Wrap the error as a transport error prefixed with `message`
    fn transport_context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_transport_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn transport_context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| wrap_transport(message.into(), e.into()))
    }

    fn with_transport_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| wrap_transport(f(), e.into()))
    }
}

fn wrap_transport(context: String, inner: Error) -> Error {
    let cause = match inner {
        Error::TransportIo { message } => message,
        other => other.to_string(),
    };
    Error::transport(format!("{context}: {cause}"))
}
