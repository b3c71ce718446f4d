//! Application context - dependency injection container

use std::sync::Arc;

use chrono::NaiveDate;
use kpfdash_core::DashboardService;
use kpfdash_domain::{Config, DashboardError, DashboardParams, Result};
use kpfdash_infra::MetricsApiClient;
use tracing::info;

/// Application context - holds the configuration and the dashboard service
pub struct AppContext {
    pub config: Config,
    pub dashboard: Arc<DashboardService>,
}

impl AppContext {
    /// Create a context from the environment or the first config file found
    pub fn new() -> Result<Self> {
        Self::new_with_config(kpfdash_infra::config::load()?)
    }

    /// Create a context with a custom configuration
    pub fn new_with_config(config: Config) -> Result<Self> {
        let client = MetricsApiClient::new(&config.api)
            .map_err(|e| DashboardError::Config(format!("failed to build metrics client: {e}")))?;

        info!(
            base_url = %client.base_url(),
            timeout_secs = config.api.timeout_secs,
            max_attempts = config.api.max_attempts,
            "metrics client ready"
        );

        let dashboard = Arc::new(DashboardService::new(Arc::new(client), config.cache.clone()));
        Ok(Self { config, dashboard })
    }

    /// Branch and range shown on startup.
    pub fn default_params(&self, today: NaiveDate) -> DashboardParams {
        self.config.dashboard.default_params(today)
    }

    /// Stops sync polling and drops every cached query.
    pub fn shutdown(&self) {
        info!("shutdown called on AppContext");
        self.dashboard.shutdown();
    }
}
