//! Error types for the coinsage domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The top-level error type for all coinsage operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Generation backend errors ---
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    // --- Tool / data provider errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolFailure),

    // --- Session memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Errors from the text-generation backend.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by backend, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Backend not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Classification of a failed external data call.
///
/// Serialized into observations so callers can distinguish a rate limit
/// (actionable: wait) from a missing credential (actionable: configure).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    RateLimited,
    Unauthorized,
    Timeout,
    NotFound,
    Unknown,
}

impl std::fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::RateLimited => "rate_limited",
            Self::Unauthorized => "unauthorized",
            Self::Timeout => "timeout",
            Self::NotFound => "not_found",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// A failed call to an external data provider.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct ToolFailure {
    pub kind: ToolErrorKind,
    pub message: String,
    /// Provider-supplied backoff hint, when present (rate limits).
    pub retry_after_secs: Option<u64>,
}

impl ToolFailure {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after_secs: None,
        }
    }

    pub fn rate_limited(message: impl Into<String>, retry_after_secs: Option<u64>) -> Self {
        Self {
            kind: ToolErrorKind::RateLimited,
            message: message.into(),
            retry_after_secs,
        }
    }

    /// Whether a single bounded retry is worthwhile.
    ///
    /// Rate limits and auth failures will fail again immediately;
    /// timeouts and unclassified upstream errors may be transient.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, ToolErrorKind::Timeout | ToolErrorKind::Unknown)
    }
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Summarization failed: {0}")]
    SummarizationFailed(String),
}
