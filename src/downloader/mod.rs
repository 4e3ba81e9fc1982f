//! Batch orchestration and rate limiting
//!
//! This module turns a date range into a set of single-day fetches, runs them
//! through a bounded worker pool under a fixed-window call quota, and merges
//! the per-day tables into one result.
//!
//! # Overview
//!
//! 1. **Job Creation**: Describe the batch with [`job::BatchJob`]
//! 2. **Scheduling**: Run it with [`scheduler::BatchScheduler`]
//! 3. **Throttling**: Dispatches are counted against [`rate_limit::QuotaWindow`]
//! 4. **Progress**: Observe each completed day through [`progress::ProgressSink`]
//! 5. **Aggregation**: Per-day outcomes are merged by [`aggregate::aggregate`]
//!
//! # Quick Start
//!
//! ```no_run
//! use miso_data_downloader::downloader::{BatchJob, BatchScheduler, NoProgress};
//! use miso_data_downloader::fetcher::miso_http::MisoHttpFetcher;
//! use miso_data_downloader::{Dataset, DateRange, NodeIdentifier};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let job = BatchJob::new(
//!     Dataset::RealTimeLmp,
//!     DateRange::parse("2023-04-01", "2023-04-30")?,
//!     NodeIdentifier::parse("ILLINOIS.HUB")?,
//!     "my-subscription-key",
//! )
//! .with_concurrency(8)
//! .with_quota(40, Duration::from_secs(60));
//!
//! let result = BatchScheduler::new(Arc::new(MisoHttpFetcher::new()))
//!     .run_batch(&job, &NoProgress)
//!     .await?;
//! println!("failed days: {:?}", result.failed_dates());
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! A failing day never aborts the batch; it is listed in
//! [`BatchResult::failed`]. `run_batch` itself only fails when:
//! - the job is invalid (nothing is dispatched)
//! - no day produced data

pub mod aggregate;
pub mod config;
pub mod job;
pub mod progress;
pub mod rate_limit;
pub mod scheduler;

pub use aggregate::{BatchResult, FailedDate, FETCH_DATE_COLUMN};
pub use config::RetryPolicy;
pub use job::{BatchJob, BatchOptions};
pub use progress::{NoProgress, ProgressSink};
pub use rate_limit::{QuotaWindow, RateLimitError};
pub use scheduler::{run_batch, BatchScheduler};

/// Batch-level errors
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Rate limit error
    #[error("rate limit error: {0}")]
    RateLimitError(#[from] RateLimitError),

    /// Validation error
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Every requested day failed
    #[error("no data: all {} requested day(s) failed", .failed.len())]
    NoData {
        /// Each day with its error, ascending
        failed: Vec<FailedDate>,
    },

}
