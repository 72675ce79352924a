// src/error.rs
//! Application error types with structured error handling.
//!
//! The variants encode the failure taxonomy the sync engine is built
//! around: transport problems are global and fatal to a sync attempt,
//! parsing problems are local and recoverable, and a page confirmed
//! absent upstream is not an error at all.

use std::fmt;
use thiserror::Error;

/// Upstream API failure modes as a typed vocabulary.
///
/// Instead of matching against raw status codes at every call site, the
/// transport classifies a response once and the rest of the engine asks
/// questions like [`ApiErrorKind::is_retryable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The server is overloaded or shedding load — back off and retry.
    Overloaded,
    /// The requested page does not exist.
    NotFound,
    /// The API rejected the query itself (bad parameters).
    BadQuery,
    /// HTTP status fallback when the error body is unparseable.
    HttpStatus(u16),
}

impl ApiErrorKind {
    /// Classifies an HTTP status code.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            429 | 503 | 524 => Self::Overloaded,
            404 => Self::NotFound,
            400 => Self::BadQuery,
            other => Self::HttpStatus(other),
        }
    }

    /// Whether this failure is transient and worth one backoff retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Overloaded)
    }

    /// Whether this failure means the resource simply doesn't exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overloaded => write!(f, "overloaded"),
            Self::NotFound => write!(f, "not_found"),
            Self::BadQuery => write!(f, "bad_query"),
            Self::HttpStatus(code) => write!(f, "http_{}", code),
        }
    }
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("Wiki API returned an error ({kind}): {message}")]
    ApiFailure { kind: ApiErrorKind, message: String },

    /// The response arrived but did not have the shape we expect.
    ///
    /// At the record level this is recoverable (skip the record, keep the
    /// run); it only becomes fatal when an entire query result is garbage.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Store(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T, E = AppError> = std::result::Result<T, E>;
