//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `KPFDASH_API_BASE_URL` is missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `KPFDASH_API_BASE_URL`: Metrics API base URL including `/api/v1`
//!   (required)
//! - `KPFDASH_HTTP_TIMEOUT_SECS`: Request timeout in seconds
//! - `KPFDASH_HTTP_MAX_ATTEMPTS`: Attempts per request (1 disables retries)
//! - `KPFDASH_STALE_AFTER_MS`: Age after which cached data is refreshed
//! - `KPFDASH_SYNC_POLL_INTERVAL_MS`: Sync status poll interval
//! - `KPFDASH_DEFAULT_BRANCH_ID`: Branch shown on startup
//! - `KPFDASH_LOG_LEVEL`: Default log filter
//! - `KPFDASH_LOG_JSON`: Emit JSON logs (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./kpfdash.json` or `./kpfdash.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use kpfdash_domain::{Config, DashboardError, Result};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the API base URL
/// is not set there, falls back to loading from a config file.
///
/// # Errors
/// Returns `DashboardError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A value cannot be parsed
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only `KPFDASH_API_BASE_URL` is required; every other setting keeps its
/// default when unset.
///
/// # Errors
/// Returns `DashboardError::Config` if the base URL is missing or a value
/// is invalid.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.api.base_url = env_var("KPFDASH_API_BASE_URL")?;
    if let Some(secs) = env_parse("KPFDASH_HTTP_TIMEOUT_SECS")? {
        config.api.timeout_secs = secs;
    }
    if let Some(attempts) = env_parse("KPFDASH_HTTP_MAX_ATTEMPTS")? {
        config.api.max_attempts = attempts;
    }

    config.cache.stale_after_ms = env_parse("KPFDASH_STALE_AFTER_MS")?;
    if let Some(interval) = env_parse("KPFDASH_SYNC_POLL_INTERVAL_MS")? {
        config.cache.sync_poll_interval_ms = interval;
    }

    if let Some(branch_id) = env_parse("KPFDASH_DEFAULT_BRANCH_ID")? {
        config.dashboard.default_branch_id = branch_id;
    }

    if let Ok(level) = std::env::var("KPFDASH_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("KPFDASH_LOG_JSON", config.logging.json);

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `DashboardError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(DashboardError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            DashboardError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| DashboardError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content, detecting the format by file
/// extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| DashboardError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| DashboardError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(DashboardError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory (`config.{json,toml}`,
/// `kpfdash.{json,toml}`), up to two parent directories, then the same
/// names next to the executable.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("kpfdash.json"),
        dir.join("kpfdash.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        DashboardError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Parse an optional environment variable; unset yields `None`.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| DashboardError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
