//! Integration tests for per-day failure isolation

use crate::support::scripted_fetcher::{date, http_500, minn_hub_job, ScriptedFetcher};
use miso_data_downloader::downloader::{BatchScheduler, DownloadError, NoProgress};
use miso_data_downloader::fetcher::{ErrorKind, FetcherError};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_middle_day_http_500() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .with_rows_per_day(1)
            .fail_on(date("2023-04-02"), http_500()),
    );
    let scheduler = BatchScheduler::new(fetcher);

    let result = scheduler
        .run_batch(&minn_hub_job("2023-04-01", "2023-04-03"), &NoProgress)
        .await
        .unwrap();

    assert_eq!(result.table.len(), 2);
    assert_eq!(
        result.succeeded_dates(),
        vec![date("2023-04-01"), date("2023-04-03")]
    );
    assert_eq!(result.failed_dates(), vec![date("2023-04-02")]);
    assert_eq!(result.failed[0].error.kind(), ErrorKind::Http(500));
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_does_not_stop_batch() {
    let fetcher = Arc::new(ScriptedFetcher::new().fail_on(
        date("2023-04-04"),
        FetcherError::Transport("connection refused".to_string()),
    ));
    let scheduler = BatchScheduler::new(fetcher.clone());

    let result = scheduler
        .run_batch(&minn_hub_job("2023-04-01", "2023-04-07"), &NoProgress)
        .await
        .unwrap();

    assert_eq!(fetcher.call_count(), 7);
    assert_eq!(result.failed_dates(), vec![date("2023-04-04")]);
    assert_eq!(result.succeeded, 6);
    assert_eq!(result.table.len(), 6 * 24);
}

#[tokio::test(start_paused = true)]
async fn test_every_day_accounted_for() {
    let job = minn_hub_job("2023-06-01", "2023-06-30").with_concurrency(5);
    let mut fetcher = ScriptedFetcher::new().with_default_delay(Duration::from_millis(5));
    for (i, day) in job.range.dates().enumerate() {
        if i % 3 == 0 {
            fetcher = fetcher.fail_on(day, FetcherError::Parse("Response contained no rows".into()));
        }
    }
    let scheduler = BatchScheduler::new(Arc::new(fetcher));

    let result = scheduler.run_batch(&job, &NoProgress).await.unwrap();

    let failed = result.failed_dates();
    let succeeded = result.succeeded_dates();
    assert_eq!(failed.len(), 10);
    assert_eq!(failed.len() + succeeded.len(), 30);
    assert!(failed.iter().all(|d| !succeeded.contains(d)));
    assert_eq!(result.total_days(), 30);
}

#[tokio::test(start_paused = true)]
async fn test_all_days_fail_is_no_data() {
    let fetcher = ScriptedFetcher::new()
        .fail_on(date("2023-04-01"), http_500())
        .fail_on(date("2023-04-02"), http_500())
        .fail_on(
            date("2023-04-03"),
            FetcherError::Http {
                status: 401,
                message: "Access denied due to invalid subscription key".to_string(),
            },
        );
    let scheduler = BatchScheduler::new(Arc::new(fetcher));

    let err = scheduler
        .run_batch(&minn_hub_job("2023-04-01", "2023-04-03"), &NoProgress)
        .await
        .unwrap_err();

    match err {
        DownloadError::NoData { failed } => {
            let dates: Vec<_> = failed.iter().map(|f| f.date).collect();
            assert_eq!(
                dates,
                vec![date("2023-04-01"), date("2023-04-02"), date("2023-04-03")]
            );
            assert_eq!(failed[2].error.kind(), ErrorKind::Http(401));
        }
        other => panic!("expected NoData, got {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_panicking_fetch_is_recorded_as_failure() {
    let fetcher = Arc::new(ScriptedFetcher::new().panic_on(date("2023-04-02")));
    let scheduler = BatchScheduler::new(fetcher);

    let result = scheduler
        .run_batch(&minn_hub_job("2023-04-01", "2023-04-03"), &NoProgress)
        .await
        .unwrap();

    assert_eq!(result.failed_dates(), vec![date("2023-04-02")]);
    assert_eq!(result.failed[0].error.kind(), ErrorKind::Transport);
    assert_eq!(result.succeeded, 2);
}
