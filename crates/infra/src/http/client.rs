//! Retrying HTTP client shared by the API adapters

use std::time::Duration;

use kpfdash_domain::constants::{
    DEFAULT_HTTP_BACKOFF_MS, DEFAULT_HTTP_MAX_ATTEMPTS, DEFAULT_HTTP_TIMEOUT_SECS,
};
use kpfdash_domain::{ApiConfig, DashboardError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client as ReqwestClient, Method, Request, RequestBuilder, Response};
use tracing::debug;

use crate::errors::InfraError;

/// How many times a request is sent and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RetryPolicy {
    max_attempts: usize,
    base_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based), doubling each time.
    fn delay(&self, retry: usize) -> Duration {
        let shift = u32::try_from(retry.saturating_sub(1).min(8)).unwrap_or(8);
        self.base_backoff.saturating_mul(1 << shift)
    }

    fn has_attempts_after(&self, attempt: usize) -> bool {
        attempt < self.max_attempts
    }
}

/// HTTP client with opt-in retries.
///
/// With `max_attempts > 1`, 5xx responses and connection-level failures of
/// idempotent requests are sent again with exponential backoff. Non-idempotent
/// methods such as POST get a single attempt. Other responses are returned
/// as-is; status handling is the caller's job.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Client with default timeout and a single attempt per request.
    pub fn new() -> Result<Self, DashboardError> {
        Self::builder().build()
    }

    /// Client with the timeout and retry policy of `config`.
    pub fn from_config(config: &ApiConfig) -> Result<Self, DashboardError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Self::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .max_attempts(config.max_attempts)
            .base_backoff(Duration::from_millis(config.backoff_ms))
            .user_agent(concat!("kpfdash/", env!("CARGO_PKG_VERSION")))
            .build()
    }

    pub fn max_attempts(&self) -> usize {
        self.retry.max_attempts
    }

    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Sends `builder`, retrying per the client's policy.
    ///
    /// # Errors
    ///
    /// Transport failures map through [`InfraError`]. A request whose body
    /// cannot be cloned fails with `DashboardError::Internal` before anything
    /// is sent.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, DashboardError> {
        let mut attempt = 1;
        loop {
            let request = rebuild(&builder)?;
            let method = request.method().clone();
            let url = request.url().clone();
            debug!(attempt, %method, %url, "sending HTTP request");

            let retry_allowed =
                method.is_idempotent() && self.retry.has_attempts_after(attempt);
            match self.client.execute(request).await {
                Ok(response) if retry_allowed && response.status().is_server_error() => {
                    debug!(attempt, %url, status = %response.status(), "retrying after server error");
                }
                Ok(response) => {
                    debug!(attempt, %url, status = %response.status(), "received HTTP response");
                    return Ok(response);
                }
                Err(err) if retry_allowed && is_retryable(&err) => {
                    debug!(attempt, %url, error = %err, "retrying after transport error");
                }
                Err(err) => return Err(InfraError::from(err).into()),
            }

            let delay = self.retry.delay(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }
}

fn rebuild(builder: &RequestBuilder) -> Result<Request, DashboardError> {
    builder
        .try_clone()
        .ok_or_else(|| DashboardError::Internal("request body is not replayable".into()))?
        .build()
        .map_err(|err| InfraError::from(err).into())
}

fn is_retryable(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Builder for [`HttpClient`].
///
/// System proxies are ignored; the metrics API is reached directly.
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    retry: RetryPolicy,
    user_agent: Option<String>,
    default_headers: Option<HeaderMap>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            retry: RetryPolicy {
                max_attempts: DEFAULT_HTTP_MAX_ATTEMPTS,
                base_backoff: Duration::from_millis(DEFAULT_HTTP_BACKOFF_MS),
            },
            user_agent: None,
            default_headers: None,
        }
    }
}

impl HttpClientBuilder {
    /// Per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total attempts per request, the first one included. Zero counts as one.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.retry.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.retry.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> Result<HttpClient, DashboardError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }
        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder.build().map_err(InfraError::from)?;
        Ok(HttpClient { client, retry: self.retry })
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use reqwest::StatusCode;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, Request as MockRequest, ResponseTemplate};

    use super::*;

    fn retrying(attempts: usize) -> HttpClient {
        HttpClient::builder()
            .base_backoff(Duration::from_millis(5))
            .max_attempts(attempts)
            .build()
            .unwrap()
    }

    async fn get(client: &HttpClient, url: &str) -> Result<Response, DashboardError> {
        client.send(client.request(Method::GET, url)).await
    }

    #[test]
    fn backoff_doubles_per_retry() {
        let policy = RetryPolicy { max_attempts: 4, base_backoff: Duration::from_millis(100) };
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(400));
        assert!(policy.has_attempts_after(3));
        assert!(!policy.has_attempts_after(4));
    }

    #[tokio::test]
    async fn default_client_makes_a_single_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let response = get(&client, &server.uri()).await.unwrap();

        assert_eq!(client.max_attempts(), 1);
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn server_errors_are_retried_until_success() {
        let server = MockServer::start().await;
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        Mock::given(method("GET"))
            .respond_with(move |_: &MockRequest| {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    ResponseTemplate::new(503)
                } else {
                    ResponseTemplate::new(200).set_body_string("[]")
                }
            })
            .expect(3)
            .mount(&server)
            .await;

        let response = get(&retrying(3), &server.uri()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn last_server_error_is_returned_when_attempts_run_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let config = ApiConfig { max_attempts: 2, backoff_ms: 5, ..ApiConfig::default() };
        let client = HttpClient::from_config(&config).unwrap();
        let response = get(&client, &server.uri()).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn client_errors_are_returned_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(422))
            .expect(1)
            .mount(&server)
            .await;

        let response = get(&retrying(3), &server.uri()).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn post_is_sent_once_despite_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = retrying(3);
        let request = client.request(Method::POST, server.uri()).body("{}");
        let response = client.send(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn from_config_asks_for_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::from_config(&ApiConfig::default()).unwrap();
        let response = get(&client, &server.uri()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn refused_connection_is_a_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        match get(&retrying(2), &url).await {
            Err(DashboardError::Network(msg)) => assert_eq!(msg, "HTTP connection failure"),
            other => panic!("expected network error, got {other:?}"),
        }
    }
}
