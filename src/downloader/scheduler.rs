//! Rate-limited batch scheduler
//!
//! Dispatches one fetch per day from a single dispatch loop into a bounded
//! pool of spawned tasks. Before every dispatch the loop checks the quota
//! window; when it is exhausted, dispatching pauses for one full window while
//! completions keep being collected and reported. Outcomes land in a
//! date-keyed map, so completion order never affects the merged result.

use crate::downloader::aggregate::{aggregate, BatchResult};
use crate::downloader::job::{BatchJob, BatchOptions};
use crate::downloader::progress::{ProgressSink, ProgressState, ProgressTracker};
use crate::downloader::rate_limit::QuotaWindow;
use crate::downloader::DownloadError;
use crate::fetcher::{DayFetcher, FetchOutcome, FetcherError};
use crate::metrics::{record_day_failure, record_quota_wait, BatchMetrics};
use crate::registry::DatasetRegistry;
use crate::shutdown::{self, SharedShutdown, ShutdownCoordinator};
use crate::{Dataset, DateRange, NodeIdentifier};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

type DayTask = (NaiveDate, FetchOutcome);

/// Runs batch jobs against a [`DayFetcher`]
pub struct BatchScheduler {
    fetcher: Arc<dyn DayFetcher>,
    progress_tracker: ProgressTracker,
    shutdown: Option<SharedShutdown>,
}

impl BatchScheduler {
    /// Create a scheduler; picks up the global shutdown handle if one is registered
    pub fn new(fetcher: Arc<dyn DayFetcher>) -> Self {
        Self {
            fetcher,
            progress_tracker: ProgressTracker::default(),
            shutdown: shutdown::get_global_shutdown(),
        }
    }

    /// Attach a shared shutdown handle for graceful cancellation.
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Override progress logging configuration.
    pub fn with_progress_tracker(mut self, tracker: ProgressTracker) -> Self {
        self.progress_tracker = tracker;
        self
    }

    /// Fetch every day of `job` and merge the results
    ///
    /// `progress` is called after each day's outcome is recorded with
    /// `(completed, total)`; `completed` increases by one per call and ends at
    /// `total`.
    ///
    /// # Errors
    /// - [`DownloadError::ValidationError`] before anything is dispatched
    /// - [`DownloadError::NoData`] when no day produced data
    ///
    /// Individual day failures are not errors; they are listed in
    /// [`BatchResult::failed`].
    pub async fn run_batch(
        &self,
        job: &BatchJob,
        progress: &dyn ProgressSink,
    ) -> Result<BatchResult, DownloadError> {
        let metrics = BatchMetrics::start(job.dataset, job.identifier.as_str());

        if let Err(msg) = job.validate() {
            metrics.record_failure(&msg);
            return Err(DownloadError::ValidationError(msg));
        }
        let mut quota = QuotaWindow::new(job.options.max_calls_per_window, job.options.window)?;

        warn_if_unregistered(job.dataset, &job.identifier);

        let total = job.total_days();
        info!(
            dataset = %job.dataset,
            identifier = %job.identifier,
            range = %job.range,
            days = total,
            concurrency = job.options.concurrency,
            max_calls_per_window = job.options.max_calls_per_window,
            window_secs = job.options.window.as_secs(),
            "Starting batch"
        );

        let mut tally = Tally::new(total, progress, self.progress_tracker.create_state(total));
        let mut workers: JoinSet<DayTask> = JoinSet::new();
        let mut pending = job.range.dates().peekable();
        let mut throttle_waits = 0u32;

        while let Some(&date) = pending.peek() {
            if self.shutdown_requested() {
                warn!(
                    undispatched = total - tally.dispatched,
                    "Shutdown requested - no further days will be dispatched"
                );
                break;
            }

            // Checked before pool capacity so a full pool never delays the pause.
            if quota.is_exhausted() {
                if self.pause_for_quota(&mut quota, &mut workers, &mut tally).await {
                    throttle_waits += 1;
                    tally.state.record_throttle();
                }
                continue;
            }

            if workers.len() >= job.options.concurrency {
                if let Some(joined) = workers.join_next().await {
                    tally.record_joined(joined);
                }
                continue;
            }

            pending.next();
            quota.record_dispatch();
            tally.mark_dispatched(date);

            let fetcher = Arc::clone(&self.fetcher);
            let request = job.request_for(date);
            debug!(
                date = %date,
                in_flight = workers.len() + 1,
                quota_remaining = quota.remaining(),
                "Dispatching day"
            );
            workers.spawn(async move {
                let outcome = fetcher.fetch(&request).await;
                (request.date, outcome)
            });
        }

        for date in pending {
            tally.record(date, Err(FetcherError::Cancelled));
        }

        while let Some(joined) = workers.join_next().await {
            tally.record_joined(joined);
        }
        tally.settle_lost_tasks();

        let mut result = aggregate(tally.outcomes);
        result.throttle_waits = throttle_waits;

        if result.succeeded == 0 {
            metrics.record_failure("no day produced data");
            return Err(DownloadError::NoData {
                failed: result.failed,
            });
        }

        if !result.failed.is_empty() {
            warn!(
                failed_days = result.failed.len(),
                dates = ?result.failed_dates(),
                "Some days failed"
            );
        }
        metrics.record_success(result.table.len(), result.failed.len());

        Ok(result)
    }

    /// Pause dispatching for one full window, collecting completions meanwhile
    ///
    /// Returns `false` if shutdown cut the pause short.
    async fn pause_for_quota(
        &self,
        quota: &mut QuotaWindow,
        workers: &mut JoinSet<DayTask>,
        tally: &mut Tally<'_>,
    ) -> bool {
        let pause = quota.pause_duration();
        info!(
            calls = quota.calls_made(),
            window_used_ms = quota.window_start().elapsed().as_millis() as u64,
            pause_secs = pause.as_secs(),
            "Quota window exhausted, pausing dispatch"
        );

        let started = Instant::now();
        let sleep = tokio::time::sleep(pause);
        tokio::pin!(sleep);

        let completed = loop {
            tokio::select! {
                _ = &mut sleep => break true,
                Some(joined) = workers.join_next(), if !workers.is_empty() => {
                    tally.record_joined(joined);
                }
                _ = wait_for_shutdown(self.shutdown.as_deref()) => {
                    info!("Shutdown requested during quota pause");
                    break false;
                }
            }
        };

        record_quota_wait(started.elapsed());
        quota.reset(Instant::now());
        completed
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|s| s.is_shutdown_requested())
            .unwrap_or(false)
    }
}

/// Validate raw inputs, build a job, and run it
///
/// Convenience wrapper around [`BatchScheduler::run_batch`] for callers that
/// hold plain strings.
pub async fn run_batch(
    fetcher: Arc<dyn DayFetcher>,
    dataset: Dataset,
    range: DateRange,
    identifier: &str,
    api_key: &str,
    options: BatchOptions,
    progress: &dyn ProgressSink,
) -> Result<BatchResult, DownloadError> {
    let identifier = NodeIdentifier::parse(identifier)
        .map_err(|e| DownloadError::ValidationError(e.to_string()))?;
    let job = BatchJob::new(dataset, range, identifier, api_key).with_options(options);
    BatchScheduler::new(fetcher).run_batch(&job, progress).await
}

async fn wait_for_shutdown(shutdown: Option<&ShutdownCoordinator>) {
    match shutdown {
        Some(shutdown) => shutdown.wait_for_shutdown().await,
        None => std::future::pending().await,
    }
}

fn warn_if_unregistered(dataset: Dataset, identifier: &NodeIdentifier) {
    match DatasetRegistry::load() {
        Ok(registry) if !registry.is_known(dataset, identifier) => warn!(
            dataset = %dataset,
            identifier = %identifier,
            "Identifier is not in the registry; the API may reject it"
        ),
        Ok(_) => {}
        Err(e) => debug!(error = %e, "Registry unavailable, skipping identifier check"),
    }
}

/// Per-day bookkeeping for one batch
struct Tally<'a> {
    outcomes: BTreeMap<NaiveDate, FetchOutcome>,
    in_flight: BTreeSet<NaiveDate>,
    dispatched: usize,
    total: usize,
    sink: &'a dyn ProgressSink,
    state: ProgressState,
}

impl<'a> Tally<'a> {
    fn new(total: usize, sink: &'a dyn ProgressSink, state: ProgressState) -> Self {
        Self {
            outcomes: BTreeMap::new(),
            in_flight: BTreeSet::new(),
            dispatched: 0,
            total,
            sink,
            state,
        }
    }

    fn mark_dispatched(&mut self, date: NaiveDate) {
        self.in_flight.insert(date);
        self.dispatched += 1;
    }

    fn record_joined(&mut self, joined: Result<DayTask, JoinError>) {
        match joined {
            Ok((date, outcome)) => {
                self.in_flight.remove(&date);
                self.record(date, outcome);
            }
            // The day stays in `in_flight` and is settled after the drain.
            Err(e) => error!(error = %e, "Fetch task terminated abnormally"),
        }
    }

    /// Days whose task panicked never reported back; count them as failed
    fn settle_lost_tasks(&mut self) {
        for date in std::mem::take(&mut self.in_flight) {
            self.record(
                date,
                Err(FetcherError::Transport(
                    "fetch task terminated abnormally".to_string(),
                )),
            );
        }
    }

    fn record(&mut self, date: NaiveDate, outcome: FetchOutcome) {
        // A day only counts as fetched if it contributes rows.
        let outcome = match outcome {
            Ok(table) if table.is_empty() => {
                Err(FetcherError::Parse("Response contained no rows".to_string()))
            }
            other => other,
        };

        match &outcome {
            Ok(table) => debug!(date = %date, rows = table.len(), "Day fetched"),
            Err(e) => {
                record_day_failure(e.kind());
                warn!(date = %date, error = %e, "Day failed");
            }
        }

        self.state.record(outcome.is_err());
        self.outcomes.insert(date, outcome);
        self.sink.on_progress(self.outcomes.len(), self.total);

        if self.state.should_emit_update() {
            info!("{}", self.state.format_progress());
            self.state.mark_emitted();
        }
    }
}
