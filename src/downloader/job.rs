//! Batch job parameters and validation

use crate::downloader::config::{
    DEFAULT_CONCURRENCY, DEFAULT_MAX_CALLS_PER_WINDOW, DEFAULT_WINDOW, MAX_CONCURRENCY,
    MAX_RANGE_DAYS,
};
use crate::{Dataset, DateRange, FetchRequest, NodeIdentifier};
use chrono::NaiveDate;
use std::fmt;
use std::time::Duration;

/// Scheduling knobs for one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Maximum simultaneous in-flight fetches
    pub concurrency: usize,
    /// Dispatches allowed before a quota pause
    pub max_calls_per_window: u32,
    /// Length of the quota pause
    pub window: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            max_calls_per_window: DEFAULT_MAX_CALLS_PER_WINDOW,
            window: DEFAULT_WINDOW,
        }
    }
}

/// One batch download: a dataset, a node or region, and a range of days
#[derive(Clone)]
pub struct BatchJob {
    /// Dataset to download
    pub dataset: Dataset,
    /// Inclusive range of days
    pub range: DateRange,
    /// Pricing node or load region
    pub identifier: NodeIdentifier,
    /// Subscription key sent with every request
    pub api_key: String,
    /// Scheduling options
    pub options: BatchOptions,
}

impl BatchJob {
    /// Create a job with default scheduling options
    pub fn new(
        dataset: Dataset,
        range: DateRange,
        identifier: NodeIdentifier,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            dataset,
            range,
            identifier,
            api_key: api_key.into(),
            options: BatchOptions::default(),
        }
    }

    /// Replace all scheduling options
    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the worker pool size
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.options.concurrency = concurrency;
        self
    }

    /// Set the call quota
    pub fn with_quota(mut self, max_calls_per_window: u32, window: Duration) -> Self {
        self.options.max_calls_per_window = max_calls_per_window;
        self.options.window = window;
        self
    }

    /// Validate job parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.trim().is_empty() {
            return Err("API key cannot be empty".to_string());
        }

        if self.options.concurrency == 0 || self.options.concurrency > MAX_CONCURRENCY {
            return Err(format!(
                "Concurrency must be between 1 and {MAX_CONCURRENCY}, got {}",
                self.options.concurrency
            ));
        }

        if self.options.max_calls_per_window == 0 {
            return Err("Max calls per window must be at least 1".to_string());
        }

        let days = self.range.num_days();
        if days > MAX_RANGE_DAYS {
            return Err(format!(
                "Date range {} spans {days} days; at most {MAX_RANGE_DAYS} are allowed",
                self.range
            ));
        }

        Ok(())
    }

    /// Number of single-day requests the job issues
    pub fn total_days(&self) -> usize {
        self.range.num_days()
    }

    /// Request for one day of this job
    pub fn request_for(&self, date: NaiveDate) -> FetchRequest {
        FetchRequest::new(
            self.dataset,
            date,
            self.identifier.clone(),
            self.api_key.clone(),
        )
    }
}

impl fmt::Debug for BatchJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchJob")
            .field("dataset", &self.dataset)
            .field("range", &self.range)
            .field("identifier", &self.identifier)
            .field("api_key", &"<redacted>")
            .field("options", &self.options)
            .finish()
    }
}
