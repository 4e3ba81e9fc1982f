//! Integration tests for batch dispatch, ordering and progress reporting

use crate::support::scripted_fetcher::{date, minn_hub_job, ScriptedFetcher};
use miso_data_downloader::downloader::{BatchScheduler, DownloadError, NoProgress};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_three_days_all_succeed() {
    let fetcher = Arc::new(ScriptedFetcher::new().with_rows_per_day(1));
    let scheduler = BatchScheduler::new(fetcher.clone());

    let result = scheduler
        .run_batch(&minn_hub_job("2023-04-01", "2023-04-03"), &NoProgress)
        .await
        .unwrap();

    assert_eq!(result.table.len(), 3);
    assert!(result.failed.is_empty());
    assert_eq!(result.succeeded, 3);
    assert_eq!(
        result.succeeded_dates(),
        vec![date("2023-04-01"), date("2023-04-02"), date("2023-04-03")]
    );
    assert_eq!(result.table.get(0, "node"), Some(&json!("MINN.HUB")));
}

#[tokio::test(start_paused = true)]
async fn test_every_day_fetched_exactly_once() {
    let fetcher = Arc::new(ScriptedFetcher::new().with_default_delay(Duration::from_millis(50)));
    let scheduler = BatchScheduler::new(fetcher.clone());
    let job = minn_hub_job("2024-02-01", "2024-03-31").with_concurrency(7);

    let result = scheduler.run_batch(&job, &NoProgress).await.unwrap();

    let mut calls = fetcher.calls();
    calls.sort();
    let expected: Vec<_> = job.range.dates().collect();
    assert_eq!(calls, expected, "one call per day, no duplicates or gaps");
    assert_eq!(result.table.len(), expected.len() * 24);
}

#[tokio::test(start_paused = true)]
async fn test_reverse_completion_order_still_sorted() {
    // Earlier days take longer, so completions arrive newest-first.
    let mut fetcher = ScriptedFetcher::new().with_rows_per_day(2);
    for (i, day) in ["2023-04-01", "2023-04-02", "2023-04-03", "2023-04-04", "2023-04-05"]
        .iter()
        .enumerate()
    {
        fetcher = fetcher.delay_on(date(day), Duration::from_secs(10 - 2 * i as u64));
    }
    let fetcher = Arc::new(fetcher);
    let scheduler = BatchScheduler::new(fetcher.clone());
    let job = minn_hub_job("2023-04-01", "2023-04-05").with_concurrency(5);

    let result = scheduler.run_batch(&job, &NoProgress).await.unwrap();

    let stamps: Vec<String> = (0..result.table.len())
        .map(|row| result.table.get(row, "fetch_date").unwrap().as_str().unwrap().to_string())
        .collect();
    let mut sorted = stamps.clone();
    sorted.sort();
    assert_eq!(stamps, sorted);
    assert_eq!(stamps.first().map(String::as_str), Some("2023-04-01"));
    assert_eq!(stamps.len(), 10);
}

#[tokio::test(start_paused = true)]
async fn test_progress_counts_each_completion() {
    let fetcher = Arc::new(ScriptedFetcher::new().with_default_delay(Duration::from_millis(10)));
    let scheduler = BatchScheduler::new(fetcher);
    let seen = Mutex::new(Vec::new());

    scheduler
        .run_batch(
            &minn_hub_job("2023-04-01", "2023-04-10").with_concurrency(3),
            &|done: usize, total: usize| seen.lock().unwrap().push((done, total)),
        )
        .await
        .unwrap();

    let seen = seen.into_inner().unwrap();
    let expected: Vec<_> = (1..=10).map(|n| (n, 10)).collect();
    assert_eq!(seen, expected);
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_is_bounded() {
    let fetcher = Arc::new(ScriptedFetcher::new().with_default_delay(Duration::from_secs(1)));
    let scheduler = BatchScheduler::new(fetcher.clone());

    scheduler
        .run_batch(
            &minn_hub_job("2023-04-01", "2023-04-12").with_concurrency(3),
            &NoProgress,
        )
        .await
        .unwrap();

    assert_eq!(fetcher.max_in_flight(), 3);
    assert_eq!(fetcher.call_count(), 12);
}

#[tokio::test(start_paused = true)]
async fn test_single_day_range() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let scheduler = BatchScheduler::new(fetcher.clone());

    let result = scheduler
        .run_batch(&minn_hub_job("2023-04-01", "2023-04-01"), &NoProgress)
        .await
        .unwrap();

    assert_eq!(fetcher.call_count(), 1);
    assert_eq!(result.throttle_waits, 0);
    assert_eq!(result.succeeded_dates(), vec![date("2023-04-01")]);
}

#[tokio::test(start_paused = true)]
async fn test_validation_happens_before_dispatch() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let scheduler = BatchScheduler::new(fetcher.clone());

    let zero_workers = minn_hub_job("2023-04-01", "2023-04-03").with_concurrency(0);
    let err = scheduler
        .run_batch(&zero_workers, &NoProgress)
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::ValidationError(_)));

    let mut no_key = minn_hub_job("2023-04-01", "2023-04-03");
    no_key.api_key = String::new();
    let err = scheduler.run_batch(&no_key, &NoProgress).await.unwrap_err();
    assert!(matches!(err, DownloadError::ValidationError(ref msg) if msg.contains("API key")));

    assert_eq!(fetcher.call_count(), 0);
}
