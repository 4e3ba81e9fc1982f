//! End-to-end batch against a mock MISO gateway

use miso_data_downloader::downloader::{BatchJob, BatchScheduler, NoProgress};
use miso_data_downloader::fetcher::miso_http::MisoHttpFetcher;
use miso_data_downloader::fetcher::ErrorKind;
use miso_data_downloader::{Dataset, DateRange, NodeIdentifier};
use mockito::Matcher;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;

fn day_body(day: &str) -> String {
    json!({"data": [
        {"interval": "1", "node": "MINN.HUB", "lmp": 20.0, "day": day},
        {"interval": "2", "node": "MINN.HUB", "lmp": 21.0, "day": day}
    ]})
    .to_string()
}

#[tokio::test]
async fn test_three_day_batch_with_failing_middle_day() {
    let mut server = mockito::Server::new_async().await;
    let mut mocks = Vec::new();
    for day in ["2023-04-01", "2023-04-03"] {
        mocks.push(
            server
                .mock("GET", format!("/pricing/v1/day-ahead/{day}/lmp-expost").as_str())
                .match_query(Matcher::UrlEncoded("node".into(), "MINN.HUB".into()))
                .match_header("Ocp-Apim-Subscription-Key", "test-key")
                .with_status(200)
                .with_body(day_body(day))
                .expect(1)
                .create_async()
                .await,
        );
    }
    mocks.push(
        server
            .mock("GET", "/pricing/v1/day-ahead/2023-04-02/lmp-expost")
            .match_query(Matcher::Any)
            .with_status(500)
            .expect(1)
            .create_async()
            .await,
    );

    let fetcher = MisoHttpFetcher::with_client(Arc::new(Client::new()), server.url());
    let scheduler = BatchScheduler::new(Arc::new(fetcher));
    let job = BatchJob::new(
        Dataset::DayAheadLmp,
        DateRange::parse("2023-04-01", "2023-04-03").unwrap(),
        NodeIdentifier::parse("MINN.HUB").unwrap(),
        "test-key",
    );

    let result = scheduler.run_batch(&job, &NoProgress).await.unwrap();

    for mock in &mocks {
        mock.assert_async().await;
    }
    assert_eq!(result.table.len(), 4);
    assert_eq!(
        result.table.columns(),
        &["fetch_date", "interval", "node", "lmp", "day"]
    );
    assert_eq!(result.table.get(0, "fetch_date"), Some(&json!("2023-04-01")));
    assert_eq!(result.table.get(3, "fetch_date"), Some(&json!("2023-04-03")));
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].date.to_string(), "2023-04-02");
    assert_eq!(result.failed[0].error.kind(), ErrorKind::Http(500));
}
