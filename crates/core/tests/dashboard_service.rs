//! Integration tests for `DashboardService`

mod support;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use kpfdash_common::cache::QueryStatus;
use kpfdash_common::time::MockClock;
use kpfdash_core::DashboardService;
use kpfdash_domain::{
    DashboardError, FetchError, QueryDefaults, QueryKey, ResourceKind, SyncState,
    SyncTriggerRequest,
};
use rust_decimal::Decimal;
use support::metrics::{date, labor_record, params, MockMetricsSource};

fn service(source: &MockMetricsSource) -> DashboardService {
    DashboardService::new(Arc::new(source.clone()), QueryDefaults::default())
}

/// Lets spawned fetch tasks run to completion.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn concurrent_kpi_reads_share_one_call() {
    let source = MockMetricsSource::new();
    let service = service(&source);
    let p = params(1);

    let (a, b, c) =
        tokio::join!(service.kpi_summary(p), service.kpi_summary(p), service.kpi_summary(p));

    assert_eq!(source.calls("kpi_summary"), 1);
    for entry in [&a, &b, &c] {
        assert_eq!(entry.status(), QueryStatus::Success);
        assert_eq!(entry.data().unwrap().revenue_total, Decimal::from(100_001));
    }
    assert_eq!(service.stats(ResourceKind::Kpi).fetches, 1);
}

#[tokio::test]
async fn switching_ranges_reuses_cached_entries() {
    let source = MockMetricsSource::new();
    let service = service(&source);

    service.labor(params(1)).await;
    service.labor(params(2)).await;
    service.labor(params(1)).await;
    service.labor(params(2)).await;

    assert_eq!(source.calls("labor"), 2);

    service.revenue(params(1)).await;
    assert_eq!(source.calls("revenue"), 1);
}

#[tokio::test]
async fn labor_report_groups_records() {
    let source = MockMetricsSource::new().with_labor(vec![
        labor_record("A", Some("kitchen"), 5, 1500),
        labor_record("B", Some("hall"), 3, 750),
        labor_record("C", Some("kitchen"), 2, 600),
    ]);
    let service = service(&source);

    let view = service.labor_report(params(1)).await;
    assert_eq!(view.status, QueryStatus::Success);
    assert!(view.error.is_none());

    let report = view.report.unwrap();
    let kitchen = report.section("kitchen").unwrap();
    assert_eq!(kitchen.rows.len(), 2);
    assert_eq!(kitchen.total_cost, Decimal::from(2100));
    assert_eq!(report.section("hall").unwrap().total_hours, Decimal::from(3));
    assert_eq!(report.grand_total_hours, Decimal::from(10));
    assert_eq!(report.grand_total_cost, Decimal::from(2850));
}

#[tokio::test]
async fn failed_refresh_keeps_previous_report() {
    let source =
        MockMetricsSource::new().with_labor(vec![labor_record("A", Some("hall"), 4, 1000)]);
    let service = service(&source);
    let p = params(1);

    service.labor_report(p).await;
    source.fail_with(Some(FetchError::http(503, "Service Unavailable")));
    assert!(service.invalidate(&QueryKey::ranged(ResourceKind::Labor, &p)));

    // Stale data is served while the refresh runs.
    let during = service.labor_report(p).await;
    assert_eq!(during.status, QueryStatus::Success);
    assert_eq!(during.report.as_ref().unwrap().grand_total_cost, Decimal::from(1000));

    settle().await;
    let after = service.peek_labor_report(&p).unwrap();
    assert_eq!(after.status, QueryStatus::Error);
    assert_eq!(after.error.as_ref().and_then(FetchError::status), Some(503));
    assert_eq!(after.report.unwrap().grand_total_cost, Decimal::from(1000));
    assert_eq!(source.calls("labor"), 2);
}

#[tokio::test]
async fn failure_without_data_is_recorded_not_raised() {
    let source = MockMetricsSource::new();
    source.fail_with(Some(FetchError::network("connection refused")));
    let service = service(&source);

    let view = service.labor_report(params(3)).await;
    assert_eq!(view.status, QueryStatus::Error);
    assert!(view.report.is_none());
    assert_eq!(view.error, Some(FetchError::network("connection refused")));
    assert_eq!(service.stats(ResourceKind::Labor).failures, 1);
}

#[tokio::test]
async fn stale_data_is_served_while_revalidating() {
    let source = MockMetricsSource::new();
    let clock = Arc::new(MockClock::new());
    let defaults = QueryDefaults { stale_after_ms: Some(60_000), ..QueryDefaults::default() };
    let service =
        DashboardService::with_clock(Arc::new(source.clone()), defaults, Arc::clone(&clock));
    let p = params(1);

    service.writeoffs(p).await;
    clock.advance(Duration::from_secs(30));
    service.writeoffs(p).await;
    assert_eq!(source.calls("writeoffs"), 1);

    clock.advance(Duration::from_secs(31));
    let entry = service.writeoffs(p).await;
    assert!(entry.has_data());
    assert_eq!(entry.display_status(), QueryStatus::Success);

    settle().await;
    assert_eq!(source.calls("writeoffs"), 2);
}

#[tokio::test]
async fn invalidate_range_marks_cached_queries() {
    let source = MockMetricsSource::new();
    let service = service(&source);
    let p = params(1);

    service.kpi_summary(p).await;
    service.writeoff_summary(p).await;
    assert_eq!(service.invalidate_range(&p), 2);
    assert_eq!(service.invalidate_range(&params(9)), 0);

    service.kpi_summary(p).await;
    settle().await;
    assert_eq!(source.calls("kpi_summary"), 2);
    assert_eq!(source.calls("writeoff_summary"), 1);
}

#[tokio::test]
async fn evicted_query_is_fetched_again() {
    let source = MockMetricsSource::new();
    let service = service(&source);

    service.branches().await;
    assert!(service.evict(&QueryKey::new(ResourceKind::Branches)));
    let entry = service.branches().await;

    assert_eq!(source.calls("branches"), 2);
    assert_eq!(entry.data().unwrap()[0].name, "Центр");
}

#[tokio::test(start_paused = true)]
async fn sync_status_polls_only_while_subscribed() {
    let source = MockMetricsSource::new();
    source.set_sync_state(Some(SyncState::Running));
    let defaults = QueryDefaults { sync_poll_interval_ms: 1_000, ..QueryDefaults::default() };
    let service = DashboardService::new(Arc::new(source.clone()), defaults);

    let subscription = service.subscribe_sync_status(|_| {});
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    assert_eq!(source.calls("sync_status"), 4);

    drop(subscription);
    tokio::time::sleep(Duration::from_millis(5_000)).await;
    assert_eq!(source.calls("sync_status"), 4);

    let _subscription = service.subscribe_sync_status(|_| {});
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(source.calls("sync_status"), 5);
}

#[tokio::test(start_paused = true)]
async fn trigger_sync_refreshes_subscribed_status() {
    let source = MockMetricsSource::new();
    source.set_sync_state(Some(SyncState::Success));
    let service = service(&source);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = service.subscribe_sync_status(move |entry| {
        if let Some(status) = entry.data() {
            sink.lock().unwrap().push((**status).as_ref().map(|batch| batch.status));
        }
    });
    settle().await;
    assert_eq!(source.calls("sync_status"), 1);

    source.set_sync_state(Some(SyncState::Running));
    let request =
        SyncTriggerRequest { date_from: Some(date(2024, 5, 1)), date_to: Some(date(2024, 5, 7)) };
    let response = service.trigger_sync(request.clone()).await.unwrap();
    settle().await;

    assert_eq!(response.sync_batch_id, "batch-1");
    assert_eq!(source.triggers(), vec![request]);
    assert_eq!(source.calls("sync_status"), 2);
    assert_eq!(seen.lock().unwrap().last(), Some(&Some(SyncState::Running)));
}

#[tokio::test]
async fn failed_trigger_does_not_touch_sync_status() {
    let source = MockMetricsSource::new();
    let service = service(&source);

    service.sync_status().await;
    source.fail_with(Some(FetchError::http(500, "Internal Server Error")));
    let err = service.trigger_sync(SyncTriggerRequest::default()).await.unwrap_err();

    assert!(matches!(err, DashboardError::Network(_)));
    settle().await;
    assert_eq!(source.calls("sync_status"), 1);
    assert!(source.triggers().is_empty());
}

#[tokio::test]
async fn shutdown_stops_polling() {
    let source = MockMetricsSource::new();
    let service = service(&source);

    let _subscription = service.subscribe_sync_status(|_| {});
    settle().await;
    service.shutdown();

    assert_eq!(service.stats(ResourceKind::SyncStatus).entries, 0);
}
