//! Application constants
//!
//! Centralized location for domain-level constants used throughout the
//! application.

// Metrics API
pub const API_BASE_PATH: &str = "/api/v1";
pub const DEFAULT_API_ORIGIN: &str = "http://localhost:8000";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_MAX_ATTEMPTS: usize = 1;
pub const DEFAULT_HTTP_BACKOFF_MS: u64 = 200;
pub const SYNC_TRIGGER_PATH: &str = "/sync/trigger";

// Query refresh policy
pub const DEFAULT_SYNC_POLL_INTERVAL_MS: u64 = 10_000;

// Dashboard defaults
pub const DEFAULT_BRANCH_ID: i64 = 1;
pub const DEFAULT_RANGE_START_DAYS_AGO: i64 = 7;
pub const DEFAULT_RANGE_END_DAYS_AGO: i64 = 1;

// Query parameter names
pub const PARAM_BRANCH_ID: &str = "branch_id";
pub const PARAM_DATE_FROM: &str = "date_from";
pub const PARAM_DATE_TO: &str = "date_to";

/// Group assigned to labor records with no group.
pub const FALLBACK_LABOR_GROUP: &str = "other";
