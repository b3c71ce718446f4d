//! Logging and tracing setup
//!
//! Installs the global `tracing` subscriber used by the binary. The filter
//! comes from `RUST_LOG` when it is set, otherwise from
//! [`LoggingConfig::level`]; output is human-readable or JSON lines.

use kpfdash_domain::{DashboardError, LoggingConfig, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Builds the log filter for `config`, preferring `RUST_LOG`.
///
/// # Errors
/// Returns `DashboardError::Config` if the configured level is not a valid
/// filter directive.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| {
        DashboardError::Config(format!("Invalid log level '{}': {e}", config.level))
    })
}

/// Installs the global subscriber.
///
/// # Errors
/// Returns `DashboardError::Internal` if a global subscriber is already
/// installed, or `DashboardError::Config` for an invalid level.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    installed.map_err(|e| {
        DashboardError::Internal(format!("Failed to install tracing subscriber: {e}"))
    })
}
