//! In-memory mock for the `MetricsSource` port
//!
//! Serves canned data, counts calls per operation and can be switched into
//! a failing mode to exercise error retention.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use kpfdash_core::{FetchResult, MetricsSource};
use kpfdash_domain::{
    Branch, DashboardParams, DateRange, FetchError, KpfSummary, LaborRecord, RevenueRow,
    SyncState, SyncStatus, SyncTriggerRequest, SyncTriggerResponse, WriteoffRow,
    WriteoffSummaryRow,
};
use rust_decimal::Decimal;

/// Mock metrics API.
///
/// Clones share state, so a test can keep a handle after passing one to the
/// service.
#[derive(Default, Clone)]
pub struct MockMetricsSource {
    labor: Arc<Mutex<Vec<LaborRecord>>>,
    sync_state: Arc<Mutex<Option<SyncState>>>,
    failure: Arc<Mutex<Option<FetchError>>>,
    calls: Arc<Mutex<HashMap<&'static str, usize>>>,
    triggers: Arc<Mutex<Vec<SyncTriggerRequest>>>,
}

impl MockMetricsSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the labor rows returned for every range.
    pub fn with_labor(self, records: Vec<LaborRecord>) -> Self {
        self.set_labor(records);
        self
    }

    pub fn set_labor(&self, records: Vec<LaborRecord>) {
        *self.labor.lock().unwrap() = records;
    }

    pub fn set_sync_state(&self, state: Option<SyncState>) {
        *self.sync_state.lock().unwrap() = state;
    }

    /// Makes every following call fail with `error`; `None` recovers.
    pub fn fail_with(&self, error: Option<FetchError>) {
        *self.failure.lock().unwrap() = error;
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls.lock().unwrap().get(operation).copied().unwrap_or(0)
    }

    pub fn triggers(&self) -> Vec<SyncTriggerRequest> {
        self.triggers.lock().unwrap().clone()
    }

    fn record_call(&self, operation: &'static str) -> FetchResult<()> {
        *self.calls.lock().unwrap().entry(operation).or_insert(0) += 1;
        match self.failure.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MetricsSource for MockMetricsSource {
    async fn kpi_summary(&self, params: &DashboardParams) -> FetchResult<KpfSummary> {
        self.record_call("kpi_summary")?;
        Ok(kpi(params.branch_id))
    }

    async fn revenue(&self, params: &DashboardParams) -> FetchResult<Vec<RevenueRow>> {
        self.record_call("revenue")?;
        Ok(vec![RevenueRow {
            date: params.range.date_from(),
            order_type: "hall".to_string(),
            order_type_detail: "Зал".to_string(),
            revenue_amount: Decimal::from(1000),
            order_count: 12,
            item_name: None,
            item_quantity: None,
            item_quantity_adjusted: None,
        }])
    }

    async fn labor(&self, _params: &DashboardParams) -> FetchResult<Vec<LaborRecord>> {
        self.record_call("labor")?;
        Ok(self.labor.lock().unwrap().clone())
    }

    async fn writeoffs(&self, params: &DashboardParams) -> FetchResult<Vec<WriteoffRow>> {
        self.record_call("writeoffs")?;
        Ok(vec![WriteoffRow {
            date: params.range.date_from(),
            article_name: "Бракераж кухня".to_string(),
            category: "spoilage".to_string(),
            amount: Decimal::new(34_010, 2),
        }])
    }

    async fn writeoff_summary(
        &self,
        _params: &DashboardParams,
    ) -> FetchResult<Vec<WriteoffSummaryRow>> {
        self.record_call("writeoff_summary")?;
        Ok(vec![WriteoffSummaryRow {
            category: "spoilage".to_string(),
            total_amount: Decimal::new(34_010, 2),
        }])
    }

    async fn sync_status(&self) -> FetchResult<Option<SyncStatus>> {
        self.record_call("sync_status")?;
        let state = *self.sync_state.lock().unwrap();
        Ok(state.map(sync_status))
    }

    async fn branches(&self) -> FetchResult<Vec<Branch>> {
        self.record_call("branches")?;
        Ok(vec![Branch {
            id: 1,
            name: "Центр".to_string(),
            city: Some("Москва".to_string()),
            territory: None,
            is_active: true,
        }])
    }

    async fn trigger_sync(&self, request: &SyncTriggerRequest) -> FetchResult<SyncTriggerResponse> {
        self.record_call("trigger_sync")?;
        self.triggers.lock().unwrap().push(request.clone());
        Ok(SyncTriggerResponse {
            sync_batch_id: format!("batch-{}", self.calls("trigger_sync")),
            message: "Sync started".to_string(),
        })
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn params(branch_id: i64) -> DashboardParams {
    DashboardParams::new(branch_id, DateRange::new(date(2024, 5, 1), date(2024, 5, 7)).unwrap())
}

pub fn labor_record(name: &str, group: Option<&str>, hours: i64, cost: i64) -> LaborRecord {
    LaborRecord {
        employee_name: name.to_string(),
        role_name: Some("Повар".to_string()),
        group: group.map(str::to_string),
        total_hours: Decimal::from(hours),
        hourly_rate: Decimal::from(300),
        labor_cost: Decimal::from(cost),
    }
}

fn kpi(branch_id: i64) -> KpfSummary {
    KpfSummary {
        revenue_total: Decimal::from(100_000 + branch_id),
        revenue_delivery: Decimal::from(20_000),
        revenue_hall: Decimal::from(80_000 + branch_id),
        labor_cost_total: Decimal::from(25_000),
        kitchen_labor_cost: Decimal::from(15_000),
        hall_labor_cost: Decimal::from(10_000),
        writeoff_total: Decimal::from(1_200),
        lc_percent: Decimal::from(25),
        kc_percent: Decimal::from(15),
        khinkali_count: Decimal::from(640),
        upsells: None,
        cogs_percent: None,
    }
}

fn sync_status(state: SyncState) -> SyncStatus {
    SyncStatus {
        batch_id: "b-1".to_string(),
        sync_type: "manual".to_string(),
        status: state,
        records_processed: 10,
        error_message: None,
        started_at: Utc.with_ymd_and_hms(2024, 5, 8, 3, 0, 0).unwrap(),
        completed_at: None,
    }
}
