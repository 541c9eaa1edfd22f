//! Error types for the i-doit API client.
//!
//! This module defines `IdoitError`, the unified error type returned by every
//! fallible operation in the crate, and `ErrorKind`, a coarse classification
//! callers can branch on without matching every variant.
//!
//! # Security
//!
//! Error messages built from server output are sanitized so that the API key
//! and password never leak into logs. Use `sanitize_message()` when quoting
//! external text in an error.

use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;

/// Error codes reserved by JSON-RPC 2.0 and used by i-doit.
pub mod codes {
    /// Invalid JSON was received by the server.
    pub const PARSE_ERROR: i64 = -32700;
    /// The JSON sent is not a valid request object.
    pub const INVALID_REQUEST: i64 = -32600;
    /// The method does not exist or is not available.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Invalid method parameters, including unknown or missing attributes.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i64 = -32603;
    /// Generic i-doit system error (authentication, missing rights, ...).
    pub const SYSTEM_ERROR: i64 = -32099;
}

/// Coarse classification of an [`IdoitError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or missing client settings, raised at construction.
    Configuration,
    /// The connection/session state machine was used out of order.
    InvalidOperation,
    /// A caller-supplied argument was rejected before sending.
    InvalidArgument,
    /// Network or HTTP-level failure.
    Transport,
    /// The server answered but violated the JSON-RPC contract.
    Protocol,
    /// The server reported a well-formed JSON-RPC error.
    Application,
}

/// Unified error type for all client operations.
#[derive(Error, Debug)]
pub enum IdoitError {
    /// Configuration error - missing or invalid settings.
    #[error("configuration error: {0}")]
    Config(String),

    /// The call is not allowed in the current connection or session state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// An argument was rejected before anything was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// HTTP request failed during transmission.
    #[error("HTTP request failed: {}", with_root_cause(.0))]
    Http(#[source] reqwest::Error),

    /// HTTP client initialization failed.
    #[error("HTTP client error: {}", with_root_cause(.0))]
    HttpClient(#[source] reqwest::Error),

    /// The server returned a non-success status code without a usable body.
    #[error("server responded with HTTP status code {}", status.as_u16())]
    HttpStatus {
        /// The HTTP status code returned.
        status: reqwest::StatusCode,
        /// The sanitized, truncated response body.
        body: String,
    },

    /// Request timed out.
    #[error("request timed out after {duration:?} - the server may be slow or unreachable")]
    Timeout {
        /// The configured connect timeout.
        duration: Duration,
        /// The JSON-RPC method (or "batch") that timed out.
        operation: String,
    },

    /// The response violated the JSON-RPC contract.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// i-doit returned a JSON-RPC error object.
    #[error("i-doit API error {code}: {message}")]
    Api {
        /// JSON-RPC error code (always negative).
        code: i64,
        /// Server message, with error details appended when present.
        message: String,
        /// The request id this error relates to, if known.
        request_id: Option<u64>,
    },

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IdoitError {
    /// Creates a configuration error for an invalid value.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        IdoitError::Config(message.into())
    }

    /// Creates an invalid-operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        IdoitError::InvalidOperation(message.into())
    }

    /// Creates an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        IdoitError::InvalidArgument(message.into())
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        IdoitError::Protocol(message.into())
    }

    /// Creates an API error with optional request context.
    pub fn api(code: i64, message: impl Into<String>, request_id: Option<u64>) -> Self {
        IdoitError::Api {
            code,
            message: message.into(),
            request_id,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(duration: Duration, operation: impl Into<String>) -> Self {
        IdoitError::Timeout {
            duration,
            operation: operation.into(),
        }
    }

    /// Returns the classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            IdoitError::Config(_) => ErrorKind::Configuration,
            IdoitError::InvalidOperation(_) => ErrorKind::InvalidOperation,
            IdoitError::InvalidArgument(_) | IdoitError::Serialization(_) => {
                ErrorKind::InvalidArgument
            }
            IdoitError::Http(_)
            | IdoitError::HttpClient(_)
            | IdoitError::HttpStatus { .. }
            | IdoitError::Timeout { .. } => ErrorKind::Transport,
            IdoitError::Protocol(_) => ErrorKind::Protocol,
            IdoitError::Api { .. } => ErrorKind::Application,
        }
    }

    /// Returns the server's JSON-RPC error code for application errors.
    #[must_use]
    pub fn code(&self) -> Option<i64> {
        match self {
            IdoitError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true if this error was reported by the i-doit server.
    #[must_use]
    pub fn is_api(&self) -> bool {
        self.kind() == ErrorKind::Application
    }

    /// Returns true if this is a network or HTTP-level failure.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    /// Replaces every occurrence of `secret` in `message` with `[REDACTED]`.
    ///
    /// Empty secrets leave the message untouched.
    #[must_use]
    pub fn sanitize_message(message: &str, secret: &str) -> String {
        if secret.is_empty() {
            return message.to_string();
        }
        message.replace(secret, "[REDACTED]")
    }

    /// Creates a sanitized version of this error's display message.
    #[must_use]
    pub fn sanitized_display(&self, secrets: &[&str]) -> String {
        secrets
            .iter()
            .fold(self.to_string(), |message, secret| {
                Self::sanitize_message(&message, secret)
            })
    }
}

/// Appends the innermost source, e.g. the OS error behind a failed connect.
fn with_root_cause(error: &reqwest::Error) -> String {
    let mut root: Option<&dyn StdError> = None;
    let mut next = error.source();
    while let Some(cause) = next {
        root = Some(cause);
        next = cause.source();
    }
    match root {
        Some(cause) => format!("{}: {}", error, cause),
        None => error.to_string(),
    }
}
