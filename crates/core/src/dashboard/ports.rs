//! Port interfaces for the remote metrics API
//!
//! These traits define the boundary between the dashboard logic and the
//! HTTP implementation in `kpfdash-infra`.

use async_trait::async_trait;
use kpfdash_domain::{
    Branch, DashboardParams, FetchError, KpfSummary, LaborRecord, RevenueRow, SyncStatus,
    SyncTriggerRequest, SyncTriggerResponse, WriteoffRow, WriteoffSummaryRow,
};

/// Result of one call to the metrics API.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Read and trigger operations served by the metrics API
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// KPI summary for a branch and date range
    async fn kpi_summary(&self, params: &DashboardParams) -> FetchResult<KpfSummary>;

    /// Revenue rows for a branch and date range
    async fn revenue(&self, params: &DashboardParams) -> FetchResult<Vec<RevenueRow>>;

    /// Labor records for a branch and date range, in API order
    async fn labor(&self, params: &DashboardParams) -> FetchResult<Vec<LaborRecord>>;

    /// Write-off rows for a branch and date range
    async fn writeoffs(&self, params: &DashboardParams) -> FetchResult<Vec<WriteoffRow>>;

    /// Write-off totals per category for a branch and date range
    async fn writeoff_summary(
        &self,
        params: &DashboardParams,
    ) -> FetchResult<Vec<WriteoffSummaryRow>>;

    /// Latest sync batch, or `None` if nothing has been synced yet
    async fn sync_status(&self) -> FetchResult<Option<SyncStatus>>;

    /// All branches known to the backend
    async fn branches(&self) -> FetchResult<Vec<Branch>>;

    /// Starts a sync run on the backend
    async fn trigger_sync(&self, request: &SyncTriggerRequest) -> FetchResult<SyncTriggerResponse>;
}
