//! Dashboard query service - cached reads over the metrics API

use std::sync::Arc;

use kpfdash_common::cache::{
    fetcher, CacheEntry, Fetcher, QueryCache, QueryOptions, QueryStats, QueryStatus, Subscription,
};
use kpfdash_common::time::{Clock, SystemClock};
use kpfdash_domain::{
    Branch, DashboardParams, FetchError, KpfSummary, LaborRecord, QueryDefaults, QueryKey,
    ResourceKind, Result, RevenueRow, SyncStatus, SyncTriggerRequest, SyncTriggerResponse,
    WriteoffRow, WriteoffSummaryRow,
};
use tracing::{debug, info};

use super::ports::MetricsSource;
use crate::report::{group, GroupedReport};

/// Query cache for one resource of the metrics API.
pub type DashboardCache<T, C = SystemClock> = QueryCache<QueryKey, T, FetchError, C>;

/// Snapshot of one cached dashboard query.
pub type DashboardEntry<T> = CacheEntry<T, FetchError>;

/// Builds a fetcher that calls one `MetricsSource` method.
macro_rules! source_fetcher {
    ($source:expr, |$s:ident| $call:expr) => {{
        let source = Arc::clone($source);
        fetcher(move || {
            let $s = Arc::clone(&source);
            async move { $call.await }
        })
    }};
}

/// Runs `$body` against the cache that serves `$resource`.
macro_rules! with_cache {
    ($service:expr, $resource:expr, |$cache:ident| $body:expr) => {
        match $resource {
            ResourceKind::Kpi => {
                let $cache = &$service.kpi;
                $body
            }
            ResourceKind::Revenue => {
                let $cache = &$service.revenue;
                $body
            }
            ResourceKind::Labor => {
                let $cache = &$service.labor;
                $body
            }
            ResourceKind::Writeoffs => {
                let $cache = &$service.writeoffs;
                $body
            }
            ResourceKind::WriteoffSummary => {
                let $cache = &$service.writeoff_summary;
                $body
            }
            ResourceKind::SyncStatus => {
                let $cache = &$service.sync_status;
                $body
            }
            ResourceKind::Branches => {
                let $cache = &$service.branches;
                $body
            }
        }
    };
}

/// Labor data as the presentation layer shows it: display status, grouped
/// report built from the latest data, and the last error if the most recent
/// fetch failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaborReportView {
    pub status: QueryStatus,
    pub report: Option<GroupedReport>,
    pub error: Option<FetchError>,
}

impl LaborReportView {
    fn from_entry(entry: &DashboardEntry<Vec<LaborRecord>>) -> Self {
        Self {
            status: entry.display_status(),
            report: entry.data().map(|records| group(records.as_slice())),
            error: entry.error().cloned(),
        }
    }
}

/// Cached access to every dashboard resource.
///
/// Each resource has its own [`QueryCache`]; keys are
/// [`QueryKey`]s built from the resource and the branch/date parameters.
/// Ranged resources follow `QueryDefaults::stale_after`; the sync status
/// additionally polls at `QueryDefaults::sync_poll_interval` while
/// subscribed.
pub struct DashboardService<C: Clock = SystemClock> {
    source: Arc<dyn MetricsSource>,
    defaults: QueryDefaults,
    kpi: DashboardCache<KpfSummary, C>,
    revenue: DashboardCache<Vec<RevenueRow>, C>,
    labor: DashboardCache<Vec<LaborRecord>, C>,
    writeoffs: DashboardCache<Vec<WriteoffRow>, C>,
    writeoff_summary: DashboardCache<Vec<WriteoffSummaryRow>, C>,
    sync_status: DashboardCache<Option<SyncStatus>, C>,
    branches: DashboardCache<Vec<Branch>, C>,
}

impl DashboardService<SystemClock> {
    /// Create a new dashboard service
    pub fn new(source: Arc<dyn MetricsSource>, defaults: QueryDefaults) -> Self {
        Self::with_clock(source, defaults, SystemClock)
    }
}

impl<C: Clock + Clone> DashboardService<C> {
    /// Create a dashboard service whose caches age data with `clock`
    pub fn with_clock(source: Arc<dyn MetricsSource>, defaults: QueryDefaults, clock: C) -> Self {
        Self {
            source,
            defaults,
            kpi: QueryCache::with_clock(clock.clone()),
            revenue: QueryCache::with_clock(clock.clone()),
            labor: QueryCache::with_clock(clock.clone()),
            writeoffs: QueryCache::with_clock(clock.clone()),
            writeoff_summary: QueryCache::with_clock(clock.clone()),
            sync_status: QueryCache::with_clock(clock.clone()),
            branches: QueryCache::with_clock(clock),
        }
    }
}

impl<C: Clock> DashboardService<C> {
    pub fn defaults(&self) -> &QueryDefaults {
        &self.defaults
    }

    fn data_options(&self) -> QueryOptions {
        QueryOptions::builder().stale_after_opt(self.defaults.stale_after()).build()
    }

    fn sync_options(&self) -> QueryOptions {
        QueryOptions::builder()
            .stale_after_opt(self.defaults.stale_after())
            .refresh_interval(self.defaults.sync_poll_interval())
            .build()
    }

    pub async fn kpi_summary(&self, params: DashboardParams) -> DashboardEntry<KpfSummary> {
        let key = QueryKey::ranged(ResourceKind::Kpi, &params);
        let load = source_fetcher!(&self.source, |source| source.kpi_summary(&params));
        self.kpi.read_or_fetch(key, load, self.data_options()).await
    }

    pub async fn revenue(&self, params: DashboardParams) -> DashboardEntry<Vec<RevenueRow>> {
        let key = QueryKey::ranged(ResourceKind::Revenue, &params);
        let load = source_fetcher!(&self.source, |source| source.revenue(&params));
        self.revenue.read_or_fetch(key, load, self.data_options()).await
    }

    pub async fn labor(&self, params: DashboardParams) -> DashboardEntry<Vec<LaborRecord>> {
        let key = QueryKey::ranged(ResourceKind::Labor, &params);
        self.labor.read_or_fetch(key, self.labor_fetcher(params), self.data_options()).await
    }

    pub async fn writeoffs(&self, params: DashboardParams) -> DashboardEntry<Vec<WriteoffRow>> {
        let key = QueryKey::ranged(ResourceKind::Writeoffs, &params);
        let load = source_fetcher!(&self.source, |source| source.writeoffs(&params));
        self.writeoffs.read_or_fetch(key, load, self.data_options()).await
    }

    pub async fn writeoff_summary(
        &self,
        params: DashboardParams,
    ) -> DashboardEntry<Vec<WriteoffSummaryRow>> {
        let key = QueryKey::ranged(ResourceKind::WriteoffSummary, &params);
        let load = source_fetcher!(&self.source, |source| source.writeoff_summary(&params));
        self.writeoff_summary.read_or_fetch(key, load, self.data_options()).await
    }

    pub async fn sync_status(&self) -> DashboardEntry<Option<SyncStatus>> {
        let key = QueryKey::new(ResourceKind::SyncStatus);
        self.sync_status.read_or_fetch(key, self.sync_fetcher(), self.sync_options()).await
    }

    pub async fn branches(&self) -> DashboardEntry<Vec<Branch>> {
        let key = QueryKey::new(ResourceKind::Branches);
        let load = source_fetcher!(&self.source, |source| source.branches());
        self.branches.read_or_fetch(key, load, self.data_options()).await
    }

    /// Labor records for `params`, grouped into report sections.
    ///
    /// The report is rebuilt from the cached snapshot on every call; while a
    /// refresh is running the previous report stays visible.
    pub async fn labor_report(&self, params: DashboardParams) -> LaborReportView {
        LaborReportView::from_entry(&self.labor(params).await)
    }

    /// Current labor report for `params` without triggering a fetch.
    pub fn peek_labor_report(&self, params: &DashboardParams) -> Option<LaborReportView> {
        self.labor
            .peek(&QueryKey::ranged(ResourceKind::Labor, params))
            .map(|entry| LaborReportView::from_entry(&entry))
    }

    /// Calls `listener` with a fresh report view after every transition of
    /// the labor query for `params`.
    pub fn subscribe_labor_report<F>(&self, params: DashboardParams, listener: F) -> Subscription
    where
        F: Fn(&LaborReportView) + Send + Sync + 'static,
    {
        let key = QueryKey::ranged(ResourceKind::Labor, &params);
        self.labor.subscribe(key, self.labor_fetcher(params), self.data_options(), move |entry| {
            listener(&LaborReportView::from_entry(entry));
        })
    }

    /// Subscribes to the sync status, which is polled while at least one
    /// subscription is alive.
    pub fn subscribe_sync_status<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&DashboardEntry<Option<SyncStatus>>) + Send + Sync + 'static,
    {
        let key = QueryKey::new(ResourceKind::SyncStatus);
        self.sync_status.subscribe(key, self.sync_fetcher(), self.sync_options(), listener)
    }

    /// Starts a sync run and marks the cached sync status stale, so
    /// subscribers see the new batch without waiting for the next poll.
    pub async fn trigger_sync(&self, request: SyncTriggerRequest) -> Result<SyncTriggerResponse> {
        let response = self.source.trigger_sync(&request).await?;
        info!(
            batch_id = %response.sync_batch_id,
            date_from = ?request.date_from,
            date_to = ?request.date_to,
            "sync triggered"
        );
        self.sync_status.invalidate(&QueryKey::new(ResourceKind::SyncStatus));
        Ok(response)
    }

    /// Marks one query stale. Returns `false` if it was never read.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        with_cache!(self, key.resource(), |cache| cache.invalidate(key))
    }

    /// Marks every ranged query for `params` stale; returns how many were
    /// cached.
    pub fn invalidate_range(&self, params: &DashboardParams) -> usize {
        let invalidated = [
            ResourceKind::Kpi,
            ResourceKind::Revenue,
            ResourceKind::Labor,
            ResourceKind::Writeoffs,
            ResourceKind::WriteoffSummary,
        ]
        .into_iter()
        .filter(|resource| self.invalidate(&QueryKey::ranged(*resource, params)))
        .count();
        debug!(branch_id = params.branch_id, invalidated, "dashboard range invalidated");
        invalidated
    }

    /// Drops one query from its cache.
    pub fn evict(&self, key: &QueryKey) -> bool {
        with_cache!(self, key.resource(), |cache| cache.evict(key))
    }

    pub fn stats(&self, resource: ResourceKind) -> QueryStats {
        with_cache!(self, resource, |cache| cache.stats())
    }

    /// Empties every cache.
    pub fn clear(&self) {
        for resource in RESOURCES {
            with_cache!(self, resource, |cache| cache.clear());
        }
    }

    /// Tears down every cache and stops all polling.
    pub fn shutdown(&self) {
        for resource in RESOURCES {
            with_cache!(self, resource, |cache| cache.shutdown());
        }
        info!("dashboard service shut down");
    }

    fn labor_fetcher(&self, params: DashboardParams) -> Fetcher<Vec<LaborRecord>, FetchError> {
        source_fetcher!(&self.source, |source| source.labor(&params))
    }

    fn sync_fetcher(&self) -> Fetcher<Option<SyncStatus>, FetchError> {
        source_fetcher!(&self.source, |source| source.sync_status())
    }
}

const RESOURCES: [ResourceKind; 7] = [
    ResourceKind::Kpi,
    ResourceKind::Revenue,
    ResourceKind::Labor,
    ResourceKind::Writeoffs,
    ResourceKind::WriteoffSummary,
    ResourceKind::SyncStatus,
    ResourceKind::Branches,
];
