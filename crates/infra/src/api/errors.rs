//! API-specific error types
//!
//! Classifies failures of metrics API calls and converts them into the
//! [`FetchError`] stored in cache entries.

use std::time::Duration;

use kpfdash_domain::{DashboardError, FetchError};
use reqwest::StatusCode;
use thiserror::Error;

/// Categories of API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Rate limiting errors (429)
    RateLimit,
    /// Server errors (5xx)
    Server,
    /// Client errors (4xx except 429)
    Client,
    /// Network/connection errors and timeouts
    Network,
    /// Response body did not match the expected shape
    Decode,
    /// Configuration errors
    Config,
}

/// API operation errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Rate limit exceeded: {status} {reason}")]
    RateLimit { status: u16, reason: String },

    #[error("Server error: {status} {reason}")]
    Server { status: u16, reason: String },

    #[error("Client error: {status} {reason}")]
    Client { status: u16, reason: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Classifies a non-2xx response. The reason is the standard reason
    /// phrase of `status`.
    pub fn from_status(status: StatusCode) -> Self {
        let code = status.as_u16();
        let reason = status.canonical_reason().unwrap_or("Unknown Status").to_string();

        if status == StatusCode::TOO_MANY_REQUESTS {
            Self::RateLimit { status: code, reason }
        } else if status.is_server_error() {
            Self::Server { status: code, reason }
        } else {
            Self::Client { status: code, reason }
        }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::RateLimit { .. } => ApiErrorCategory::RateLimit,
            Self::Server { .. } => ApiErrorCategory::Server,
            Self::Client { .. } => ApiErrorCategory::Client,
            Self::Network(_) | Self::Timeout(_) => ApiErrorCategory::Network,
            Self::Decode(_) => ApiErrorCategory::Decode,
            Self::Config(_) => ApiErrorCategory::Config,
        }
    }

    /// Whether a later attempt may succeed. Only used for logging; refresh
    /// policy belongs to the query cache.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.category(),
            ApiErrorCategory::RateLimit | ApiErrorCategory::Server | ApiErrorCategory::Network
        )
    }

    /// HTTP status code, when the API answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimit { status, .. }
            | Self::Server { status, .. }
            | Self::Client { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<ApiError> for FetchError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::RateLimit { status, reason }
            | ApiError::Server { status, reason }
            | ApiError::Client { status, reason } => Self::Http { status, reason },
            ApiError::Network(message) => Self::Network { message },
            ApiError::Timeout(timeout) => {
                Self::Timeout { millis: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX) }
            }
            ApiError::Decode(message) => Self::MalformedResponse { message },
            ApiError::Config(message) => {
                Self::Network { message: format!("configuration error: {message}") }
            }
        }
    }
}

/// Transport errors raised by [`HttpClient`](crate::http::HttpClient).
impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        match err {
            DashboardError::Config(message) => Self::Config(message),
            DashboardError::Serialization(message) => Self::Decode(message),
            DashboardError::Network(message)
            | DashboardError::InvalidInput(message)
            | DashboardError::Internal(message) => Self::Network(message),
        }
    }
}
