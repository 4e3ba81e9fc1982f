//! Fixed-window call quota
//!
//! The upstream gateway allows a fixed number of calls per minute. The
//! scheduler counts dispatches against a [`QuotaWindow`]; once the count
//! reaches the limit, dispatching pauses for one full window and the count
//! starts over. The window is not sliding: the full pause is taken regardless
//! of how long the exhausted window actually lasted.

use std::time::Duration;
use tokio::time::Instant;

/// Dispatch counter for one quota window
///
/// Owned by a single batch and discarded when the batch finishes.
#[derive(Debug, Clone)]
pub struct QuotaWindow {
    max_calls: u32,
    window: Duration,
    calls_made: u32,
    window_start: Instant,
}

impl QuotaWindow {
    /// Create a quota of `max_calls` per `window`
    ///
    /// # Errors
    /// Returns an error if `max_calls` is zero.
    pub fn new(max_calls: u32, window: Duration) -> Result<Self, RateLimitError> {
        if max_calls == 0 {
            return Err(RateLimitError::InvalidQuota(
                "max calls per window must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            max_calls,
            window,
            calls_made: 0,
            window_start: Instant::now(),
        })
    }

    /// Count one dispatched call
    pub fn record_dispatch(&mut self) {
        self.calls_made = self.calls_made.saturating_add(1);
    }

    /// Whether the next dispatch must wait for a new window
    pub fn is_exhausted(&self) -> bool {
        self.calls_made >= self.max_calls
    }

    /// Calls still allowed in the current window
    pub fn remaining(&self) -> u32 {
        self.max_calls.saturating_sub(self.calls_made)
    }

    /// Start a fresh window at `now`
    pub fn reset(&mut self, now: Instant) {
        self.calls_made = 0;
        self.window_start = now;
    }

    /// How long dispatching pauses once the window is exhausted
    pub fn pause_duration(&self) -> Duration {
        self.window
    }

    /// Calls dispatched in the current window
    pub fn calls_made(&self) -> u32 {
        self.calls_made
    }

    /// When the current window started
    pub fn window_start(&self) -> Instant {
        self.window_start
    }
}

/// Rate limiter errors
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// Quota parameters are unusable
    #[error("invalid quota: {0}")]
    InvalidQuota(String),
}
