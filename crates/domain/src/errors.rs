//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for kpfdash
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum DashboardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for kpfdash operations
pub type Result<T> = std::result::Result<T, DashboardError>;

/// Failure of a single fetch against the metrics source.
///
/// Stored inside cache entries, so it is cheap to clone and carries no
/// borrowed or non-`Sync` state. `Http`, `Network` and `Timeout` are
/// transport failures; `MalformedResponse` means the body did not match the
/// expected shape. Both kinds propagate identically.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchError {
    /// Non-2xx response from the API.
    #[error("API error: {status} {reason}")]
    Http { status: u16, reason: String },

    /// The request never produced a response.
    #[error("Network error: {message}")]
    Network { message: String },

    /// The request did not complete in time.
    #[error("Request timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// The response body could not be decoded into the expected shape.
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },
}

impl FetchError {
    pub fn http(status: u16, reason: impl Into<String>) -> Self {
        Self::Http { status, reason: reason.into() }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse { message: message.into() }
    }

    /// HTTP status code, when the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for failures reaching the API (as opposed to decoding its body).
    pub fn is_transport(&self) -> bool {
        !matches!(self, Self::MalformedResponse { .. })
    }
}

impl From<FetchError> for DashboardError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::MalformedResponse { message } => Self::Serialization(message),
            other => Self::Network(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
