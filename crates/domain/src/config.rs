//! Configuration management

use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::{
    API_BASE_PATH, DEFAULT_API_ORIGIN, DEFAULT_BRANCH_ID, DEFAULT_HTTP_BACKOFF_MS,
    DEFAULT_HTTP_MAX_ATTEMPTS, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_SYNC_POLL_INTERVAL_MS,
};
use crate::query::{DashboardParams, DateRange};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: QueryDefaults,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// Metrics API connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL including the API prefix, e.g. `http://localhost:8000/api/v1`.
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Attempts per request; 1 disables transport retries.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: format!("{DEFAULT_API_ORIGIN}{API_BASE_PATH}"),
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            max_attempts: DEFAULT_HTTP_MAX_ATTEMPTS,
            backoff_ms: DEFAULT_HTTP_BACKOFF_MS,
        }
    }
}

/// Refresh policy applied to dashboard queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDefaults {
    /// Age after which cached data is served stale and refreshed in the
    /// background. `None` keeps data fresh until invalidated.
    #[serde(default)]
    pub stale_after_ms: Option<u64>,
    /// Poll interval for the sync status query while it has subscribers.
    #[serde(default = "default_sync_poll_interval_ms")]
    pub sync_poll_interval_ms: u64,
}

impl QueryDefaults {
    pub fn stale_after(&self) -> Option<Duration> {
        self.stale_after_ms.map(Duration::from_millis)
    }

    pub fn sync_poll_interval(&self) -> Duration {
        Duration::from_millis(self.sync_poll_interval_ms)
    }
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self { stale_after_ms: None, sync_poll_interval_ms: DEFAULT_SYNC_POLL_INTERVAL_MS }
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), json: false }
    }
}

/// Initial dashboard selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_branch_id")]
    pub default_branch_id: i64,
}

impl DashboardConfig {
    /// Initial selection: the default branch over the week ending yesterday.
    pub fn default_params(&self, today: NaiveDate) -> DashboardParams {
        DashboardParams::new(self.default_branch_id, DateRange::last_week(today))
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { default_branch_id: DEFAULT_BRANCH_ID }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_max_attempts() -> usize {
    DEFAULT_HTTP_MAX_ATTEMPTS
}

fn default_backoff_ms() -> u64 {
    DEFAULT_HTTP_BACKOFF_MS
}

fn default_sync_poll_interval_ms() -> u64 {
    DEFAULT_SYNC_POLL_INTERVAL_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_branch_id() -> i64 {
    DEFAULT_BRANCH_ID
}
