//! Batch configuration constants and retry policy

use std::time::Duration;

/// Default number of concurrently in-flight day fetches
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Upper bound on concurrency; more workers only burn the quota faster
pub const MAX_CONCURRENCY: usize = 32;

/// Default number of calls allowed per quota window.
/// The public MISO gateway tier allows a little more than this per minute.
pub const DEFAULT_MAX_CALLS_PER_WINDOW: u32 = 40;

/// Default quota window length
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Longest accepted date range (in days) for a single batch
pub const MAX_RANGE_DAYS: usize = 3_660;

/// Initial backoff delay in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 1000;

/// Maximum backoff delay in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 30000;

/// Upper bound on per-day retries when retrying is enabled
pub const MAX_RETRIES: u32 = 10;

/// Calculate exponential backoff delay
pub fn calculate_backoff(retry_count: u32) -> Duration {
    let delay_ms = INITIAL_BACKOFF_MS.saturating_mul(2u64.saturating_pow(retry_count));
    let delay_ms = delay_ms.min(MAX_BACKOFF_MS);
    Duration::from_millis(delay_ms)
}

/// Per-day retry policy
///
/// The default performs no retries: a failed day is reported as failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    /// Never retry
    pub const fn none() -> Self {
        Self { max_retries: 0 }
    }

    /// Retry transient failures up to `max_retries` times (capped at [`MAX_RETRIES`])
    pub fn bounded(max_retries: u32) -> Self {
        Self {
            max_retries: max_retries.min(MAX_RETRIES),
        }
    }

    /// Configured retry count
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether any retry is allowed
    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt)
    }
}
