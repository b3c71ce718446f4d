//! # kpfdash Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - HTTP client with retry support
//! - REST client for the metrics API
//! - Configuration loading from environment and files
//! - Tracing subscriber setup
//!
//! ## Architecture
//! - Implements traits defined in `kpfdash-core`
//! - Contains all "impure" code (I/O, environment, global subscriber)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use api::{ApiError, MetricsApiClient};
pub use errors::InfraError;
pub use http::HttpClient;
pub use observability::init_tracing;
