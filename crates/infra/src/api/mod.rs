//! Metrics API client
//!
//! HTTP implementation of the `MetricsSource` port from `kpfdash-core`.
//!
//! # Architecture
//!
//! - Uses the shared [`HttpClient`](crate::http::HttpClient) (no direct
//!   reqwest client construction)
//! - One transport attempt by default; refresh policy belongs to the query
//!   cache
//! - Timeout on every call
//! - Errors classified by [`ApiError`] and surfaced as `FetchError`

pub mod client;
pub mod errors;

pub use client::MetricsApiClient;
pub use errors::{ApiError, ApiErrorCategory};
