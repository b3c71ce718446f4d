//! Dashboard queries
//!
//! [`DashboardService`] owns one query cache per resource and turns the
//! [`MetricsSource`](ports::MetricsSource) port into cached, deduplicated
//! reads for the presentation layer.

pub mod ports;
pub mod service;

pub use service::{DashboardCache, DashboardEntry, DashboardService, LaborReportView};
