//! Observability metrics for batch downloads
//!
//! Counters and histograms are recorded through the `metrics` facade; they
//! are no-ops until [`init_metrics`] installs the Prometheus exporter, so the
//! library can record unconditionally.

use crate::fetcher::ErrorKind;
use crate::Dataset;
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Metrics initialization errors
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Exporter could not be installed (port in use, recorder already set)
    #[error("failed to install Prometheus exporter: {0}")]
    Install(String),
}

/// Initialize the Prometheus exporter on `addr`
///
/// Must be called from within a tokio runtime. Idempotent: later calls are
/// ignored.
pub fn init_metrics(addr: SocketAddr) -> Result<(), MetricsError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        METRICS_INITIALIZED.store(false, Ordering::SeqCst);
        return Err(MetricsError::Install(e.to_string()));
    }

    describe_counter!(
        "fetch_requests_total",
        Unit::Count,
        "Total number of single-day HTTP requests sent"
    );
    describe_histogram!(
        "fetch_duration_seconds",
        Unit::Seconds,
        "Single-day HTTP request duration"
    );
    describe_counter!(
        "fetch_retries_total",
        Unit::Count,
        "Total number of per-day retry attempts"
    );
    describe_counter!(
        "fetch_failures_total",
        Unit::Count,
        "Days recorded as failed, by error kind"
    );
    describe_counter!(
        "quota_waits_total",
        Unit::Count,
        "Times dispatching paused for the quota window"
    );
    describe_histogram!(
        "quota_wait_seconds",
        Unit::Seconds,
        "Time spent paused for the quota window"
    );
    describe_counter!(
        "batches_completed_total",
        Unit::Count,
        "Batches that produced at least one row"
    );
    describe_counter!(
        "batches_failed_total",
        Unit::Count,
        "Batches that failed validation or produced no rows"
    );

    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Whether [`init_metrics`] has installed an exporter
pub fn is_initialized() -> bool {
    METRICS_INITIALIZED.load(Ordering::SeqCst)
}

/// Generate a new correlation ID for request tracing
pub fn generate_correlation_id() -> String {
    let n = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{n:08x}")
}

/// Timing and outcome of one HTTP request
pub struct RequestMetrics {
    dataset: Dataset,
    start_time: Instant,
    correlation_id: String,
    attempt: u32,
}

impl RequestMetrics {
    /// Start recording a request
    pub fn start(dataset: Dataset, attempt: u32) -> Self {
        Self {
            dataset,
            start_time: Instant::now(),
            correlation_id: generate_correlation_id(),
            attempt,
        }
    }

    /// Record a response with a status code
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!(
            "fetch_requests_total",
            "dataset" => self.dataset.as_str(),
            "status" => status_code.to_string(),
        )
        .increment(1);
        histogram!("fetch_duration_seconds", "dataset" => self.dataset.as_str())
            .record(duration.as_secs_f64());

        if status_code == 429 {
            warn!(
                correlation_id = %self.correlation_id,
                dataset = %self.dataset,
                attempt = self.attempt,
                "Upstream quota exceeded (429)"
            );
        }

        debug!(
            correlation_id = %self.correlation_id,
            status = status_code,
            duration_ms = duration.as_millis() as u64,
            "HTTP request completed"
        );
    }

    /// Record a request that never produced a status code
    pub fn record_transport_error(&self) {
        let duration = self.start_time.elapsed();

        counter!(
            "fetch_requests_total",
            "dataset" => self.dataset.as_str(),
            "status" => "transport_error",
        )
        .increment(1);
        histogram!("fetch_duration_seconds", "dataset" => self.dataset.as_str())
            .record(duration.as_secs_f64());

        debug!(
            correlation_id = %self.correlation_id,
            attempt = self.attempt,
            duration_ms = duration.as_millis() as u64,
            "Transport error recorded"
        );
    }

    /// Correlation ID for log lines about this request
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Record a retry backoff
pub fn record_retry_backoff(duration: Duration, attempt: u32) {
    counter!("fetch_retries_total").increment(1);
    debug!(
        attempt = attempt,
        backoff_ms = duration.as_millis() as u64,
        "Retry backoff recorded"
    );
}

/// Record a pause for the quota window
pub fn record_quota_wait(duration: Duration) {
    counter!("quota_waits_total").increment(1);
    histogram!("quota_wait_seconds").record(duration.as_secs_f64());
}

/// Record a day that ended in failure
pub fn record_day_failure(kind: ErrorKind) {
    counter!("fetch_failures_total", "kind" => kind.label()).increment(1);
}

/// Whole-batch metrics
pub struct BatchMetrics {
    dataset: Dataset,
    identifier: String,
    start_time: Instant,
}

impl BatchMetrics {
    /// Start tracking a batch
    pub fn start(dataset: Dataset, identifier: impl Into<String>) -> Self {
        Self {
            dataset,
            identifier: identifier.into(),
            start_time: Instant::now(),
        }
    }

    /// Record a batch that produced rows
    pub fn record_success(&self, rows: usize, failed_days: usize) {
        counter!("batches_completed_total", "dataset" => self.dataset.as_str()).increment(1);
        info!(
            dataset = %self.dataset,
            identifier = %self.identifier,
            rows = rows,
            failed_days = failed_days,
            duration_secs = self.start_time.elapsed().as_secs(),
            "Batch completed"
        );
    }

    /// Record a batch that produced nothing
    pub fn record_failure(&self, error: &str) {
        counter!("batches_failed_total", "dataset" => self.dataset.as_str()).increment(1);
        warn!(
            dataset = %self.dataset,
            identifier = %self.identifier,
            error = %error,
            duration_secs = self.start_time.elapsed().as_secs(),
            "Batch failed"
        );
    }
}
