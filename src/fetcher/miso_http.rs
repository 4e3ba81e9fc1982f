//! MISO HTTP fetcher
//!
//! Issues one GET per day against the MISO API gateway:
//! - URL built deterministically from dataset, date and node/region
//! - `Cache-Control: no-cache` and the subscription key header on every call
//! - Only HTTP 200 is success; anything else is reported with its status
//! - No retries unless a [`RetryPolicy`] is configured

use async_trait::async_trait;
use reqwest::header::CACHE_CONTROL;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::downloader::config::RetryPolicy;
use crate::fetcher::miso_config::{build_url, DEFAULT_BASE_URL, SUBSCRIPTION_KEY_HEADER};
use crate::fetcher::miso_parser::MisoParser;
use crate::fetcher::shared_resources::global_http_client;
use crate::fetcher::{DayFetcher, FetchOutcome, FetcherError};
use crate::metrics::{record_retry_backoff, RequestMetrics};
use crate::FetchRequest;

/// Longest error body excerpt kept in [`FetcherError::Http`]
const ERROR_BODY_EXCERPT_CHARS: usize = 200;

/// HTTP-backed [`DayFetcher`] for all MISO datasets
#[derive(Clone)]
pub struct MisoHttpFetcher {
    client: Arc<Client>,
    base_url: String,
    retry: RetryPolicy,
}

impl MisoHttpFetcher {
    /// Fetcher against the public gateway using the shared client
    pub fn new() -> Self {
        Self::with_client(global_http_client(), DEFAULT_BASE_URL)
    }

    /// Fetcher with an explicit client and base URL
    pub fn with_client(client: Arc<Client>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            retry: RetryPolicy::none(),
        }
    }

    /// Override the base URL (e.g., a mock server in tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Enable retries for transient failures
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Retry policy in effect
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Perform exactly one HTTP request for the day
    pub async fn fetch_once(&self, request: &FetchRequest, attempt: u32) -> FetchOutcome {
        let url = build_url(&self.base_url, request)?;
        let metrics = RequestMetrics::start(request.dataset, attempt);

        debug!(
            correlation_id = metrics.correlation_id(),
            dataset = %request.dataset,
            date = %request.date,
            url = %url,
            "Fetching day"
        );

        let response = match self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-cache")
            .header(SUBSCRIPTION_KEY_HEADER, request.api_key.as_str())
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                metrics.record_transport_error();
                return Err(FetcherError::Transport(e.to_string()));
            }
        };

        let status = response.status();
        metrics.record_complete(status.as_u16());

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("unknown status").to_string()
            } else {
                body.trim().chars().take(ERROR_BODY_EXCERPT_CHARS).collect()
            };
            return Err(FetcherError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetcherError::Transport(format!("Failed to read response body: {e}")))?;

        MisoParser::parse_body(&body)
    }
}

impl Default for MisoHttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DayFetcher for MisoHttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> FetchOutcome {
        let mut attempt = 0;
        loop {
            match self.fetch_once(request, attempt).await {
                Err(err) if err.is_retryable() && attempt < self.retry.max_retries() => {
                    let backoff = self.retry.backoff(attempt);
                    warn!(
                        date = %request.date,
                        attempt = attempt + 1,
                        max_attempts = self.retry.max_retries() + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "Transient failure, retrying day"
                    );
                    record_retry_backoff(backoff, attempt + 1);
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }
}
