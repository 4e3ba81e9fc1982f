//! # MISO Data Downloader Library
//!
//! A library for downloading day-by-day electricity market data from the MISO
//! public data API: day-ahead and real-time locational marginal prices (LMP)
//! and hourly load forecasts.
//!
//! The upstream API serves exactly one calendar day per request and enforces a
//! per-minute call quota, so every download is a batch of single-day requests
//! pushed through a bounded worker pool and throttled against a fixed quota
//! window.
//!
//! ## Quick Start
//!
//! ```no_run
//! use miso_data_downloader::downloader::{BatchJob, BatchScheduler};
//! use miso_data_downloader::fetcher::miso_http::MisoHttpFetcher;
//! use miso_data_downloader::{Dataset, DateRange, NodeIdentifier};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let range = DateRange::parse("2023-04-01", "2023-04-03")?;
//! let node = NodeIdentifier::parse("MINN.HUB")?;
//! let job = BatchJob::new(Dataset::DayAheadLmp, range, node, "my-subscription-key");
//!
//! let scheduler = BatchScheduler::new(Arc::new(MisoHttpFetcher::new()));
//! let result = scheduler.run_batch(&job, &|done: usize, total: usize| println!("{done}/{total}")).await?;
//!
//! println!("{} rows, {} failed days", result.table.len(), result.failed.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`identifier`] - Node/region identifier validation
//! - [`registry`] - Embedded registry of datasets and known hubs/regions
//! - [`fetcher`] - Single-day fetchers (HTTP client, envelope parser)
//! - [`downloader`] - Rate-limited batch scheduler and result aggregation
//! - [`output`] - Table export (CSV)
//! - [`cli`] - Command line front end
//!
//! ## Data Types
//!
//! - [`DateRange`] - Inclusive range of calendar days
//! - [`Dataset`] - Which market product to download
//! - [`Table`] - Column-ordered tabular result of one or many fetches
//! - [`FetchRequest`] - Parameters of one single-day request

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{Days, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// CLI command implementations
pub mod cli;

/// Batch scheduling, throttling and aggregation
pub mod downloader;

/// Single-day data fetchers
pub mod fetcher;

/// Node/region identifier parsing and validation
pub mod identifier;

/// Observability metrics
pub mod metrics;

/// Table export writers
pub mod output;

/// Dataset registry with known nodes and regions
pub mod registry;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

pub use identifier::NodeIdentifier;

/// Date format used by the upstream API and on the command line
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive range of calendar days
///
/// # Examples
///
/// ```
/// use miso_data_downloader::DateRange;
///
/// let range = DateRange::parse("2023-04-01", "2023-04-03").unwrap();
/// assert_eq!(range.num_days(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, String> {
        if start > end {
            return Err(format!(
                "Start date ({start}) must not be after end date ({end})"
            ));
        }
        Ok(Self { start, end })
    }

    /// Parse a range from two `YYYY-MM-DD` strings
    pub fn parse(start: &str, end: &str) -> Result<Self, String> {
        let start = NaiveDate::parse_from_str(start.trim(), DATE_FORMAT)
            .map_err(|e| format!("Invalid start date '{start}': {e}"))?;
        let end = NaiveDate::parse_from_str(end.trim(), DATE_FORMAT)
            .map_err(|e| format!("Invalid end date '{end}': {e}"))?;
        Self::new(start, end)
    }

    /// First day of the range
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the range (inclusive)
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered, always at least 1
    pub fn num_days(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    /// Whether `date` falls inside the range
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Ascending sequence of every day in the range
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.num_days() as u64).filter_map(move |offset| start.checked_add_days(Days::new(offset)))
    }
}

impl<'de> Deserialize<'de> for DateRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Bounds {
            start: NaiveDate,
            end: NaiveDate,
        }

        let bounds = Bounds::deserialize(deserializer)?;
        Self::new(bounds.start, bounds.end).map_err(de::Error::custom)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Market product served by the MISO data API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dataset {
    /// Day-ahead ex-post LMP by pricing node
    #[serde(rename = "day-ahead")]
    DayAheadLmp,
    /// Real-time ex-post LMP by pricing node
    #[serde(rename = "real-time")]
    RealTimeLmp,
    /// Hourly load forecast by region
    #[serde(rename = "load")]
    LoadForecast,
}

impl Dataset {
    /// All supported datasets
    pub const ALL: [Dataset; 3] = [
        Dataset::DayAheadLmp,
        Dataset::RealTimeLmp,
        Dataset::LoadForecast,
    ];

    /// Short name used on the command line and in registry entries
    pub fn as_str(&self) -> &'static str {
        match self {
            Dataset::DayAheadLmp => "day-ahead",
            Dataset::RealTimeLmp => "real-time",
            Dataset::LoadForecast => "load",
        }
    }

    /// Whether the dataset is keyed by pricing node (otherwise by region)
    pub fn is_node_based(&self) -> bool {
        !matches!(self, Dataset::LoadForecast)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dataset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day-ahead" | "dayahead" | "da" => Ok(Dataset::DayAheadLmp),
            "real-time" | "realtime" | "rt" => Ok(Dataset::RealTimeLmp),
            "load" | "load-forecast" => Ok(Dataset::LoadForecast),
            _ => Err(format!(
                "Invalid dataset: {s}. Valid options: day-ahead, real-time, load"
            )),
        }
    }
}

/// Parameters of one single-day request
///
/// The API key is deliberately left out of the `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Dataset to query
    pub dataset: Dataset,
    /// Calendar day to fetch
    pub date: NaiveDate,
    /// Pricing node or load region
    pub identifier: NodeIdentifier,
    /// Opaque subscription key
    pub api_key: String,
}

impl FetchRequest {
    /// Create a new request
    pub fn new(
        dataset: Dataset,
        date: NaiveDate,
        identifier: NodeIdentifier,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            dataset,
            date,
            identifier,
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchRequest")
            .field("dataset", &self.dataset)
            .field("date", &self.date)
            .field("identifier", &self.identifier)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Column-ordered tabular data
///
/// Every row holds exactly one value per column; absent cells are
/// [`Value::Null`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given columns
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from JSON objects
    ///
    /// Columns appear in first-seen order across all records; records missing
    /// a column get a null cell.
    pub fn from_records(records: Vec<Map<String, Value>>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in &records {
            for key in record.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .into_iter()
            .map(|mut record| {
                columns
                    .iter()
                    .map(|column| record.remove(column).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    /// Assemble a table from rows already aligned with `columns`
    pub(crate) fn from_aligned_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() == columns.len()));
        Self { columns, rows }
    }

    /// Column names in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows, each aligned with [`Table::columns`]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell lookup by row index and column name
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Append a row; it must have one value per column
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), String> {
        if row.len() != self.columns.len() {
            return Err(format!(
                "Row has {} values but table has {} columns",
                row.len(),
                self.columns.len()
            ));
        }
        self.rows.push(row);
        Ok(())
    }
}

impl<'de> Deserialize<'de> for Table {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Parts {
            columns: Vec<String>,
            rows: Vec<Vec<Value>>,
        }

        let parts = Parts::deserialize(deserializer)?;
        let mut table = Table::new(parts.columns);
        for row in parts.rows {
            table.push_row(row).map_err(de::Error::custom)?;
        }
        Ok(table)
    }
}
