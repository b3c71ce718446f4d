//! # kpfdash Domain
//!
//! Business domain types and models for the restaurant metrics dashboard.
//!
//! This crate contains:
//! - Wire types returned by the metrics API (KPI summary, revenue, labor,
//!   write-offs, sync status, branches)
//! - Query keys and date-range parameters
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Display labels for labor groups and write-off categories
//!
//! ## Architecture
//! - No dependencies on other kpfdash crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod query;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use query::{DashboardParams, DateRange, QueryKey, ResourceKind};
pub use types::*;
