//! kpfdash - headless runner for the restaurant metrics dashboard
//!
//! Warms the dashboard queries for the configured branch, logs the labor
//! report, then follows the sync status until Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use kpfdash_app::{warm_up, AppContext, SyncWatcher};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();

    let ctx = AppContext::new().context("failed to load configuration")?;
    kpfdash_infra::init_tracing(&ctx.config.logging).context("failed to initialise tracing")?;

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(e) => warn!(error = %e, "could not load .env file"),
    }

    let today = chrono::Local::now().date_naive();
    let params = ctx.default_params(today);
    info!(
        branch_id = params.branch_id,
        date_from = %params.range.date_from(),
        date_to = %params.range.date_to(),
        "kpfdash starting"
    );

    let report = warm_up(&ctx.dashboard, params).await;
    info!(kpi = ?report.kpi, labor = ?report.labor.status, writeoffs = ?report.writeoffs, "warm-up done");

    let watcher = Arc::new(SyncWatcher::new());
    let subscription = {
        let watcher = Arc::clone(&watcher);
        ctx.dashboard.subscribe_sync_status(move |entry| {
            watcher.observe(entry);
        })
    };

    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
    info!("interrupt received");

    subscription.unsubscribe();
    ctx.shutdown();
    Ok(())
}
