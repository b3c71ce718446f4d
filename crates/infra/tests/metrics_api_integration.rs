//! Integration tests for `MetricsApiClient` against a mock metrics API

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use kpfdash_common::cache::QueryStatus;
use kpfdash_core::{DashboardService, MetricsSource};
use kpfdash_domain::{
    ApiConfig, DashboardParams, DateRange, FetchError, QueryDefaults, SyncState,
    SyncTriggerRequest,
};
use kpfdash_infra::{HttpClient, MetricsApiClient};
use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn params() -> DashboardParams {
    DashboardParams::new(2, DateRange::new(date(2024, 5, 1), date(2024, 5, 7)).unwrap())
}

fn client_for(server: &MockServer) -> MetricsApiClient {
    let config = ApiConfig {
        base_url: format!("{}/api/v1", server.uri()),
        timeout_secs: 5,
        ..ApiConfig::default()
    };
    MetricsApiClient::new(&config).unwrap()
}

fn kpi_body() -> serde_json::Value {
    json!({
        "revenue_total": "125000.50",
        "revenue_delivery": 25000,
        "revenue_hall": "100000.50",
        "labor_cost_total": "30000.00",
        "kitchen_labor_cost": 18000,
        "hall_labor_cost": 12000,
        "writeoff_total": 1200.25,
        "lc_percent": "24.00",
        "kc_percent": "12.50",
        "khinkali_count": 840,
        "upsells": { "uzvar_qty": 12, "sauce_qty": 30, "bread_qty": 9 }
    })
}

#[tokio::test]
async fn kpi_summary_sends_branch_and_range() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/dashboard/kpf"))
        .and(query_param("branch_id", "2"))
        .and(query_param("date_from", "2024-05-01"))
        .and(query_param("date_to", "2024-05-07"))
        .respond_with(ResponseTemplate::new(200).set_body_json(kpi_body()))
        .expect(1)
        .mount(&server)
        .await;

    let summary = client_for(&server).kpi_summary(&params()).await.unwrap();

    assert_eq!(summary.revenue_total, Decimal::new(12_500_050, 2));
    assert_eq!(summary.writeoff_total, Decimal::new(120_025, 2));
    assert_eq!(summary.khinkali_count, Decimal::from(840));
    assert_eq!(summary.upsells.unwrap().sauce_qty, Decimal::from(30));
    assert!(summary.cogs_percent.is_none());
}

#[tokio::test]
async fn labor_records_decode_exact_amounts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/labor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "employee_name": "A", "role_name": "Повар", "group": "kitchen",
              "total_hours": "5.5", "hourly_rate": "300.00", "labor_cost": "1650.00" },
            { "employee_name": "B", "total_hours": 3, "hourly_rate": 250, "labor_cost": 750 }
        ])))
        .mount(&server)
        .await;

    let records = client_for(&server).labor(&params()).await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].total_hours, Decimal::new(55, 1));
    assert_eq!(records[0].labor_cost, Decimal::from(1650));
    assert_eq!(records[1].group_key(), "other");
}

#[tokio::test]
async fn sync_status_null_means_no_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/sync/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    assert_eq!(client_for(&server).sync_status().await.unwrap(), None);
}

#[tokio::test]
async fn sync_status_decodes_running_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/sync/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "batch_id": "7f3c",
            "sync_type": "manual",
            "status": "running",
            "records_processed": 120,
            "error_message": null,
            "started_at": "2024-05-08T09:00:00+03:00",
            "completed_at": null
        })))
        .mount(&server)
        .await;

    let status = client_for(&server).sync_status().await.unwrap().unwrap();

    assert_eq!(status.batch_id, "7f3c");
    assert_eq!(status.status, SyncState::Running);
    assert!(!status.is_finished());
    assert!(status.completed_at.is_none());
}

#[tokio::test]
async fn server_error_keeps_status_and_reason() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/writeoffs"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).writeoffs(&params()).await.unwrap_err();

    assert_eq!(err, FetchError::http(503, "Service Unavailable"));
    assert_eq!(err.to_string(), "API error: 503 Service Unavailable");
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/branches"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).branches().await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn malformed_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/writeoffs/summary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
        .mount(&server)
        .await;

    let err = client_for(&server).writeoff_summary(&params()).await.unwrap_err();
    assert!(matches!(err, FetchError::MalformedResponse { .. }), "got {err:?}");
}

#[tokio::test]
async fn trigger_sync_posts_requested_range() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/sync/trigger"))
        .and(body_json(json!({ "date_from": "2024-05-01", "date_to": "2024-05-07" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sync_batch_id": "b-42",
            "message": "Sync started"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request =
        SyncTriggerRequest { date_from: Some(date(2024, 5, 1)), date_to: Some(date(2024, 5, 7)) };
    let response = client_for(&server).trigger_sync(&request).await.unwrap();

    assert_eq!(response.sync_batch_id, "b-42");
    assert_eq!(response.message, "Sync started");
}

#[tokio::test]
async fn failed_trigger_is_not_resent_with_retries_enabled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/sync/trigger"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let config = ApiConfig {
        base_url: format!("{}/api/v1", server.uri()),
        max_attempts: 3,
        backoff_ms: 5,
        ..ApiConfig::default()
    };
    let client = MetricsApiClient::new(&config).unwrap();
    let err = client.trigger_sync(&SyncTriggerRequest::default()).await.unwrap_err();

    assert_eq!(err, FetchError::http(503, "Service Unavailable"));
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/revenue"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([])).set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let http = HttpClient::builder().timeout(Duration::from_secs(30)).build().unwrap();
    let client = MetricsApiClient::with_http_client(
        format!("{}/api/v1", server.uri()),
        http,
        Duration::from_millis(100),
    );

    let err = client.revenue(&params()).await.unwrap_err();
    assert_eq!(err, FetchError::Timeout { millis: 100 });
}

#[tokio::test]
async fn dashboard_service_deduplicates_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/labor"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([
                    { "employee_name": "A", "group": "kitchen",
                      "total_hours": 5, "hourly_rate": 300, "labor_cost": 1500 },
                    { "employee_name": "B", "group": "hall",
                      "total_hours": 3, "hourly_rate": 250, "labor_cost": 750 }
                ]))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let service = DashboardService::new(Arc::new(client_for(&server)), QueryDefaults::default());
    let p = params();

    let (a, b, c) =
        tokio::join!(service.labor_report(p), service.labor_report(p), service.labor_report(p));

    for view in [&a, &b, &c] {
        assert_eq!(view.status, QueryStatus::Success);
        assert_eq!(view.report.as_ref().unwrap().grand_total_cost, Decimal::from(2250));
    }
    let again = service.labor_report(p).await;
    assert_eq!(again.report.unwrap().sections[0].key, "kitchen");

    service.shutdown();
}
