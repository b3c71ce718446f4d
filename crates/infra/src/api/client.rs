//! REST client for the metrics API
//!
//! Implements the [`MetricsSource`] port over HTTP. Every failure is
//! classified as an [`ApiError`] and handed to the caller as a
//! [`FetchError`]; retries beyond the configured transport attempts are the
//! query cache's business.

use std::time::Duration;

use async_trait::async_trait;
use kpfdash_core::{FetchResult, MetricsSource};
use kpfdash_domain::constants::SYNC_TRIGGER_PATH;
use kpfdash_domain::{
    ApiConfig, Branch, DashboardParams, KpfSummary, LaborRecord, ResourceKind, RevenueRow,
    SyncStatus, SyncTriggerRequest, SyncTriggerResponse, WriteoffRow, WriteoffSummaryRow,
};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::errors::ApiError;
use crate::http::HttpClient;

/// HTTP client for the metrics API
pub struct MetricsApiClient {
    http: HttpClient,
    base_url: String,
    timeout: Duration,
}

impl MetricsApiClient {
    /// Create a client for the API at `config.base_url`
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if the HTTP client cannot be built
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = HttpClient::from_config(config)
            .map_err(|e| ApiError::Config(format!("Failed to build HttpClient: {e}")))?;
        Ok(Self::with_http_client(config.base_url.as_str(), http, config.timeout()))
    }

    /// Create a client over an existing [`HttpClient`]
    ///
    /// `timeout` bounds each call including transport retries.
    pub fn with_http_client(base_url: impl Into<String>, http: HttpClient, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url, timeout }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Execute a GET request with query parameters
    #[instrument(skip(self, query), fields(path = %path))]
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!(url = %url, "GET request");

        let request = self.http.request(Method::GET, &url).query(query);
        let response = self.execute(request).await?;
        decode(response).await
    }

    /// Execute a POST request with a JSON body
    #[instrument(skip(self, body), fields(path = %path))]
    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!(url = %url, "POST request");

        let request = self.http.request(Method::POST, &url).json(body);
        let response = self.execute(request).await?;
        decode(response).await
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = match tokio::time::timeout(self.timeout, self.http.send(request)).await {
            Ok(result) => result?,
            Err(_) => return Err(ApiError::Timeout(self.timeout)),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::from_status(status));
        }
        Ok(response)
    }

    /// Reads one resource and converts failures for the cache.
    async fn fetch<T: DeserializeOwned>(
        &self,
        resource: ResourceKind,
        params: Option<&DashboardParams>,
    ) -> FetchResult<T> {
        let query = params.map(DashboardParams::query_pairs).unwrap_or_default();
        self.get(resource.path(), &query).await.map_err(|err| {
            warn!(
                resource = %resource,
                category = ?err.category(),
                transient = err.is_transient(),
                error = %err,
                "metrics API request failed"
            );
            err.into()
        })
    }
}

/// Decodes a JSON body; an empty body decodes like `null`.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body = response
        .bytes()
        .await
        .map_err(|e| ApiError::Network(format!("Failed to read response body: {e}")))?;

    if body.iter().all(u8::is_ascii_whitespace) {
        return serde_json::from_value(serde_json::Value::Null)
            .map_err(|_| ApiError::Decode("empty response body".to_string()));
    }
    serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl MetricsSource for MetricsApiClient {
    async fn kpi_summary(&self, params: &DashboardParams) -> FetchResult<KpfSummary> {
        self.fetch(ResourceKind::Kpi, Some(params)).await
    }

    async fn revenue(&self, params: &DashboardParams) -> FetchResult<Vec<RevenueRow>> {
        self.fetch(ResourceKind::Revenue, Some(params)).await
    }

    async fn labor(&self, params: &DashboardParams) -> FetchResult<Vec<LaborRecord>> {
        self.fetch(ResourceKind::Labor, Some(params)).await
    }

    async fn writeoffs(&self, params: &DashboardParams) -> FetchResult<Vec<WriteoffRow>> {
        self.fetch(ResourceKind::Writeoffs, Some(params)).await
    }

    async fn writeoff_summary(
        &self,
        params: &DashboardParams,
    ) -> FetchResult<Vec<WriteoffSummaryRow>> {
        self.fetch(ResourceKind::WriteoffSummary, Some(params)).await
    }

    async fn sync_status(&self) -> FetchResult<Option<SyncStatus>> {
        self.fetch(ResourceKind::SyncStatus, None).await
    }

    async fn branches(&self) -> FetchResult<Vec<Branch>> {
        self.fetch(ResourceKind::Branches, None).await
    }

    async fn trigger_sync(&self, request: &SyncTriggerRequest) -> FetchResult<SyncTriggerResponse> {
        self.post(SYNC_TRIGGER_PATH, request).await.map_err(|err| {
            warn!(error = %err, "sync trigger failed");
            err.into()
        })
    }
}
