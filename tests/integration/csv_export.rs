//! Integration tests for exporting an aggregated batch to CSV

use crate::support::scripted_fetcher::{date, http_500, minn_hub_job, ScriptedFetcher};
use miso_data_downloader::downloader::{BatchScheduler, NoProgress};
use miso_data_downloader::output::csv::write_table_csv;
use miso_data_downloader::output::path::OutputPathBuilder;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test(start_paused = true)]
async fn test_partial_batch_exports_only_successful_days() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .with_rows_per_day(2)
            .fail_on(date("2023-04-02"), http_500()),
    );
    let job = minn_hub_job("2023-04-01", "2023-04-03");
    let result = BatchScheduler::new(fetcher)
        .run_batch(&job, &NoProgress)
        .await
        .unwrap();

    let temp_dir = TempDir::new().unwrap();
    let path = OutputPathBuilder::new(
        temp_dir.path().to_path_buf(),
        job.dataset,
        &job.identifier,
        job.range,
    )
    .build();

    let rows = write_table_csv(&path, &result.table).unwrap();
    assert_eq!(rows, 4);
    assert!(path.ends_with("day-ahead/minn_hub/day_ahead_minn_hub_2023-04-01_2023-04-03.csv"));

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "fetch_date,node,hour_ending,lmp");
    assert_eq!(lines.len(), 5);
    assert!(lines[1].starts_with("2023-04-01,MINN.HUB,1,"));
    assert!(lines[4].starts_with("2023-04-03,MINN.HUB,2,"));
    assert!(!content.contains("2023-04-02"));
}
