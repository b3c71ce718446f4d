//! # kpfdash Core
//!
//! Business logic for the metrics dashboard - no HTTP or platform code.
//!
//! This crate contains:
//! - The `MetricsSource` port the REST client implements
//! - The labor report grouping engine
//! - The dashboard query facade over the query cache
//!
//! ## Architecture Principles
//! - Only depends on `kpfdash-common` and `kpfdash-domain`
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod dashboard;
pub mod report;

pub use dashboard::ports::{FetchResult, MetricsSource};
pub use dashboard::{DashboardCache, DashboardEntry, DashboardService, LaborReportView};
pub use report::{group, GroupSection, GroupedReport};
