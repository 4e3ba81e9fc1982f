//! Integration tests for graceful shutdown during a batch

use crate::support::scripted_fetcher::{date, minn_hub_job, ScriptedFetcher};
use miso_data_downloader::downloader::{BatchScheduler, NoProgress};
use miso_data_downloader::fetcher::FetcherError;
use miso_data_downloader::shutdown::ShutdownCoordinator;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_quota_pause_cancels_remaining_days() {
    let fetcher = Arc::new(ScriptedFetcher::new().with_default_delay(Duration::from_secs(1)));
    let shutdown = ShutdownCoordinator::shared();
    let scheduler = BatchScheduler::new(fetcher.clone()).with_shutdown(shutdown.clone());
    let job = minn_hub_job("2023-04-01", "2023-04-05")
        .with_concurrency(2)
        .with_quota(2, Duration::from_secs(60));

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            shutdown.request_shutdown();
        }
    });

    let started = Instant::now();
    let result = scheduler.run_batch(&job, &NoProgress).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(60));
    assert_eq!(fetcher.call_count(), 2);
    assert_eq!(
        result.succeeded_dates(),
        vec![date("2023-04-01"), date("2023-04-02")]
    );
    assert_eq!(
        result.failed_dates(),
        vec![date("2023-04-03"), date("2023-04-04"), date("2023-04-05")]
    );
    assert!(result
        .failed
        .iter()
        .all(|f| f.error == FetcherError::Cancelled));
    assert_eq!(result.total_days(), 5);
    // The interrupted pause is not a completed quota wait.
    assert_eq!(result.throttle_waits, 0);
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_days_finish_after_shutdown() {
    let fetcher = Arc::new(ScriptedFetcher::new().with_default_delay(Duration::from_secs(20)));
    let shutdown = ShutdownCoordinator::shared();
    let scheduler = BatchScheduler::new(fetcher.clone()).with_shutdown(shutdown.clone());
    let job = minn_hub_job("2023-04-01", "2023-04-06").with_concurrency(3);

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            shutdown.request_shutdown();
        }
    });

    let result = scheduler.run_batch(&job, &NoProgress).await.unwrap();

    // The first three were already dispatched and are awaited, not dropped.
    assert_eq!(fetcher.call_count(), 3);
    assert_eq!(result.succeeded, 3);
    assert_eq!(result.failed.len(), 3);
    assert_eq!(result.total_days(), 6);
}
