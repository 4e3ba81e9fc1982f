//! Progress reporting for batch downloads.
//!
//! Two consumers watch a batch: the caller's [`ProgressSink`], which receives
//! `(completed, total)` after every recorded day, and the log, which receives a
//! `[PROGRESS]` line at coarse intervals built from [`ProgressState`].

use std::time::{Duration, Instant};

const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_PERCENTAGE_STEP: f64 = 10.0;

/// Receives per-day progress from the scheduler
///
/// Called synchronously from the dispatch loop after each day's outcome is
/// recorded, so implementations should return quickly.
pub trait ProgressSink: Send + Sync {
    /// `completed` days out of `total` have an outcome
    fn on_progress(&self, completed: usize, total: usize);
}

impl<F> ProgressSink for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn on_progress(&self, completed: usize, total: usize) {
        self(completed, total)
    }
}

/// Sink that ignores all updates
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _completed: usize, _total: usize) {}
}

/// Controls how often progress is logged
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    update_interval: Duration,
    min_percentage_step: f64,
}

impl ProgressTracker {
    /// Create a tracker with custom interval and percentage step.
    pub fn new(update_interval: Duration, min_percentage_step: f64) -> Self {
        Self {
            update_interval,
            min_percentage_step,
        }
    }

    /// Build a [`ProgressState`] for a batch of `total_days`
    pub fn create_state(&self, total_days: usize) -> ProgressState {
        let mut state = ProgressState::new(total_days);
        state.update_interval = self.update_interval;
        state.min_percentage_step = self.min_percentage_step;
        state
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(DEFAULT_UPDATE_INTERVAL, DEFAULT_PERCENTAGE_STEP)
    }
}

/// Progress of one batch
#[derive(Debug, Clone)]
pub struct ProgressState {
    /// Days with a recorded outcome
    pub completed: usize,
    /// Days recorded as failed
    pub failed: usize,
    /// Days in the batch
    pub total: usize,
    /// Quota pauses taken so far
    pub throttle_waits: u32,
    /// When the batch started
    pub start_time: Instant,
    /// Last time progress was logged
    pub last_update: Instant,
    /// Minimum interval between time-based log lines
    pub update_interval: Duration,
    /// Last logged completion percentage
    pub last_reported_percentage: f64,
    /// Minimum percentage delta that triggers a log line
    pub min_percentage_step: f64,
}

impl ProgressState {
    /// Fresh state for `total` days
    pub fn new(total: usize) -> Self {
        let now = Instant::now();
        Self {
            completed: 0,
            failed: 0,
            total,
            throttle_waits: 0,
            start_time: now,
            last_update: now,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            last_reported_percentage: 0.0,
            min_percentage_step: DEFAULT_PERCENTAGE_STEP,
        }
    }

    /// Count one recorded day
    pub fn record(&mut self, failed: bool) {
        self.completed = self.completed.saturating_add(1);
        if failed {
            self.failed = self.failed.saturating_add(1);
        }
    }

    /// Count one quota pause
    pub fn record_throttle(&mut self) {
        self.throttle_waits = self.throttle_waits.saturating_add(1);
    }

    /// Completion percentage (0-100)
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.completed as f64 / self.total as f64) * 100.0
    }

    /// Days per second since the batch started
    pub fn rate(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.completed as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Whether a log line is due, by percentage step, completion, or time
    pub fn should_emit_update(&self) -> bool {
        if self.completed == 0 {
            return false;
        }
        if self.completed == self.total {
            return true;
        }
        if self.percentage() - self.last_reported_percentage >= self.min_percentage_step {
            return true;
        }
        self.last_update.elapsed() >= self.update_interval
    }

    /// Call after logging to reset timers and cached percentage.
    pub fn mark_emitted(&mut self) {
        self.last_update = Instant::now();
        self.last_reported_percentage = self.percentage();
    }

    /// Estimated time until every day has an outcome
    pub fn estimate_remaining(&self) -> Option<Duration> {
        let rate = self.rate();
        let remaining = self.total.saturating_sub(self.completed);
        if rate <= 0.0 || remaining == 0 {
            return None;
        }
        Some(Duration::from_secs_f64(remaining as f64 / rate))
    }

    /// Human-readable progress string for logging.
    pub fn format_progress(&self) -> String {
        let mut parts = vec![format!(
            "[PROGRESS] Fetched {}/{} days - {:.1}% complete",
            self.completed,
            self.total,
            self.percentage()
        )];

        if self.failed > 0 {
            parts.push(format!("({} failed)", self.failed));
        }

        if self.throttle_waits > 0 {
            parts.push(format!("after {} quota pause(s)", self.throttle_waits));
        }

        if let Some(remaining) = self.estimate_remaining() {
            parts.push(format!("- ~{} remaining", format_duration(remaining)));
        }

        parts.join(" ")
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        format!("{:.1}h", secs as f64 / 3600.0)
    }
}
