//! Merging per-day outcomes into one batch result

use crate::fetcher::{FetchOutcome, FetcherError};
use crate::{Table, DATE_FORMAT};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Column prepended to every aggregated row with the day it came from
pub const FETCH_DATE_COLUMN: &str = "fetch_date";

/// A day whose fetch did not produce data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDate {
    /// The day that failed
    pub date: NaiveDate,
    /// Why it failed
    pub error: FetcherError,
}

/// Outcome of a whole batch
///
/// Every requested day is accounted for exactly once: either its rows appear
/// in `table` (tagged with [`FETCH_DATE_COLUMN`]) or it is listed in `failed`.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    /// Rows of every successful day, in ascending date order
    pub table: Table,
    /// Failed days, in ascending date order
    pub failed: Vec<FailedDate>,
    /// Number of days that produced rows
    pub succeeded: usize,
    /// Number of quota pauses taken while dispatching
    pub throttle_waits: u32,
}

impl BatchResult {
    /// Days that failed, ascending
    pub fn failed_dates(&self) -> Vec<NaiveDate> {
        self.failed.iter().map(|f| f.date).collect()
    }

    /// Distinct days represented in the table, ascending
    pub fn succeeded_dates(&self) -> Vec<NaiveDate> {
        let Some(idx) = self.table.column_index(FETCH_DATE_COLUMN) else {
            return Vec::new();
        };
        self.table
            .rows()
            .iter()
            .filter_map(|row| row.get(idx).and_then(Value::as_str))
            .filter_map(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Total days accounted for
    pub fn total_days(&self) -> usize {
        self.succeeded + self.failed.len()
    }

    /// Whether every day succeeded
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Merge per-day outcomes into a single table plus a failure list
///
/// Columns are the union of every successful day's columns in first-seen
/// order, after [`FETCH_DATE_COLUMN`]. Cells a day did not provide are null.
/// A `fetch_date` column coming from upstream is overwritten by the day the
/// rows were requested for.
pub fn aggregate(outcomes: BTreeMap<NaiveDate, FetchOutcome>) -> BatchResult {
    let mut columns = vec![FETCH_DATE_COLUMN.to_string()];
    for table in outcomes.values().filter_map(|o| o.as_ref().ok()) {
        for column in table.columns() {
            if !columns.iter().any(|c| c == column) {
                columns.push(column.clone());
            }
        }
    }

    let width = columns.len();
    let mut rows = Vec::new();
    let mut failed = Vec::new();
    let mut succeeded = 0;

    for (date, outcome) in outcomes {
        match outcome {
            Ok(day) => {
                succeeded += 1;
                let positions: Vec<Option<usize>> = day
                    .columns()
                    .iter()
                    .map(|c| columns.iter().position(|m| m == c).filter(|&pos| pos != 0))
                    .collect();
                let stamp = Value::String(date.format(DATE_FORMAT).to_string());
                for row in day.rows() {
                    let mut cells = vec![Value::Null; width];
                    cells[0] = stamp.clone();
                    for (value, pos) in row.iter().zip(&positions) {
                        if let Some(pos) = *pos {
                            cells[pos] = value.clone();
                        }
                    }
                    rows.push(cells);
                }
            }
            Err(error) => failed.push(FailedDate { date, error }),
        }
    }

    BatchResult {
        table: Table::from_aligned_rows(columns, rows),
        failed,
        succeeded,
        throttle_waits: 0,
    }
}
