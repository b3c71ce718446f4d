//! Startup warm-up and sync status watching

use kpfdash_common::cache::QueryStatus;
use kpfdash_core::{DashboardEntry, DashboardService, LaborReportView};
use kpfdash_domain::{DashboardParams, SyncState, SyncStatus};
use parking_lot::Mutex;
use tracing::{info, warn};

/// Outcome of the startup reads.
#[derive(Debug, Clone)]
pub struct WarmupReport {
    pub kpi: QueryStatus,
    pub labor: LaborReportView,
    pub writeoffs: QueryStatus,
}

/// Reads the KPI summary, labor report and write-offs for `params`
/// concurrently and logs what came back.
pub async fn warm_up(service: &DashboardService, params: DashboardParams) -> WarmupReport {
    let (kpi, labor, writeoffs) = tokio::join!(
        service.kpi_summary(params),
        service.labor_report(params),
        service.writeoffs(params),
    );

    if let Some(summary) = kpi.data() {
        info!(
            branch_id = params.branch_id,
            revenue_total = %summary.revenue_total,
            labor_cost_total = %summary.labor_cost_total,
            lc_percent = %summary.lc_percent,
            "kpi summary loaded"
        );
    } else if let Some(err) = kpi.error() {
        warn!(branch_id = params.branch_id, error = %err, "kpi summary unavailable");
    }

    match (&labor.report, &labor.error) {
        (Some(report), _) => {
            for section in &report.sections {
                info!(
                    group = %section.key,
                    label = %section.label,
                    employees = section.rows.len(),
                    hours = %section.total_hours,
                    cost = %section.total_cost,
                    "labor group"
                );
            }
            info!(
                hours = %report.grand_total_hours,
                cost = %report.grand_total_cost,
                "labor total"
            );
        }
        (None, Some(err)) => warn!(error = %err, "labor report unavailable"),
        (None, None) => {}
    }

    if let Some(rows) = writeoffs.data() {
        info!(rows = rows.len(), "writeoffs loaded");
    } else if let Some(err) = writeoffs.error() {
        warn!(error = %err, "writeoffs unavailable");
    }

    WarmupReport { kpi: kpi.status(), labor, writeoffs: writeoffs.status() }
}

/// Logs sync status transitions seen by a subscription.
#[derive(Debug, Default)]
pub struct SyncWatcher {
    last: Mutex<Option<Observed>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Observed {
    Idle,
    Batch { batch_id: String, state: SyncState },
}

impl SyncWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `entry`; returns the new state when the latest batch or its
    /// state changed. `Some(None)` means the API reports no batch.
    pub fn observe(&self, entry: &DashboardEntry<Option<SyncStatus>>) -> Option<Option<SyncState>> {
        if let Some(err) = entry.error() {
            warn!(error = %err, "sync status poll failed");
        }

        let status: &Option<SyncStatus> = entry.data()?;
        let observed = match status {
            Some(batch) => {
                Observed::Batch { batch_id: batch.batch_id.clone(), state: batch.status }
            }
            None => Observed::Idle,
        };

        let mut last = self.last.lock();
        if last.as_ref() == Some(&observed) {
            return None;
        }

        match status {
            Some(batch) => info!(
                batch_id = %batch.batch_id,
                sync_type = %batch.sync_type,
                state = ?batch.status,
                records_processed = batch.records_processed,
                error_message = ?batch.error_message,
                "sync status changed"
            ),
            None => info!("no sync batch recorded"),
        }

        *last = Some(observed);
        Some(status.as_ref().map(|batch| batch.status))
    }
}
