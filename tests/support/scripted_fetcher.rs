//! In-memory `DayFetcher` with scripted delays and failures

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use miso_data_downloader::fetcher::{DayFetcher, FetchOutcome, FetcherError};
use miso_data_downloader::{Dataset, DateRange, FetchRequest, NodeIdentifier, Table};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// What a scripted day does instead of returning rows
#[derive(Clone)]
pub enum Script {
    Fail(FetcherError),
    Panic,
}

/// Returns one row per hour (24 rows) unless a day is scripted otherwise
pub struct ScriptedFetcher {
    scripts: HashMap<NaiveDate, Script>,
    delays: HashMap<NaiveDate, Duration>,
    default_delay: Duration,
    rows_per_day: usize,
    calls: Mutex<Vec<(NaiveDate, Instant)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            delays: HashMap::new(),
            default_delay: Duration::ZERO,
            rows_per_day: 24,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn fail_on(mut self, date: NaiveDate, error: FetcherError) -> Self {
        self.scripts.insert(date, Script::Fail(error));
        self
    }

    pub fn panic_on(mut self, date: NaiveDate) -> Self {
        self.scripts.insert(date, Script::Panic);
        self
    }

    pub fn delay_on(mut self, date: NaiveDate, delay: Duration) -> Self {
        self.delays.insert(date, delay);
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn with_rows_per_day(mut self, rows: usize) -> Self {
        self.rows_per_day = rows;
        self
    }

    /// Dates in the order they were requested
    pub fn calls(&self) -> Vec<NaiveDate> {
        self.calls.lock().unwrap().iter().map(|(d, _)| *d).collect()
    }

    /// Dates with the instant each was requested
    pub fn timed_calls(&self) -> Vec<(NaiveDate, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DayFetcher for ScriptedFetcher {
    async fn fetch(&self, request: &FetchRequest) -> FetchOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((request.date, Instant::now()));

        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        let delay = self
            .delays
            .get(&request.date)
            .copied()
            .unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.scripts.get(&request.date) {
            Some(Script::Fail(error)) => Err(error.clone()),
            Some(Script::Panic) => panic!("scripted panic for {}", request.date),
            None => {
                let records = (1..=self.rows_per_day)
                    .map(|hour| {
                        json!({
                            "node": request.identifier.as_str(),
                            "hour_ending": hour,
                            "lmp": request.date.day() as f64 + hour as f64 / 100.0,
                        })
                        .as_object()
                        .cloned()
                        .unwrap()
                    })
                    .collect();
                Ok(Table::from_records(records))
            }
        }
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn minn_hub_job(start: &str, end: &str) -> miso_data_downloader::downloader::BatchJob {
    miso_data_downloader::downloader::BatchJob::new(
        Dataset::DayAheadLmp,
        DateRange::parse(start, end).unwrap(),
        NodeIdentifier::parse("MINN.HUB").unwrap(),
        "test-key",
    )
}

pub fn http_500() -> FetcherError {
    FetcherError::Http {
        status: 500,
        message: "Internal Server Error".to_string(),
    }
}
