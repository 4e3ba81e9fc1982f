//! Single-day data fetchers
//!
//! A fetcher turns one [`FetchRequest`] (dataset, day, node/region, key) into
//! one [`FetchOutcome`]. Fetchers never panic on upstream problems and do not
//! retry unless a retry policy is configured explicitly; the batch scheduler
//! records every failure per day instead of aborting.

use crate::{FetchRequest, Table};
use async_trait::async_trait;
use std::fmt;

pub mod miso_config;
pub mod miso_http;
pub mod miso_parser;
pub mod shared_resources;

/// Per-day fetch errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetcherError {
    /// Network-level failure (timeout, DNS, connection refused)
    #[error("transport error: {0}")]
    Transport(String),

    /// Upstream answered with a status other than 200
    #[error("HTTP error {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body excerpt or reason phrase
        message: String,
    },

    /// Malformed JSON, missing `data` key, or unusable rows
    #[error("parse error: {0}")]
    Parse(String),

    /// The day was never dispatched because shutdown was requested
    #[error("cancelled before dispatch")]
    Cancelled,
}

impl FetcherError {
    /// Coarse classification of the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetcherError::Transport(_) => ErrorKind::Transport,
            FetcherError::Http { status, .. } => ErrorKind::Http(*status),
            FetcherError::Parse(_) => ErrorKind::Parse,
            FetcherError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Whether repeating the same request could plausibly succeed
    ///
    /// Transport errors, HTTP 429 and 5xx responses are transient; other
    /// client errors and parse errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetcherError::Transport(_) => true,
            FetcherError::Http { status, .. } => *status == 429 || *status >= 500,
            FetcherError::Parse(_) | FetcherError::Cancelled => false,
        }
    }

    /// Short remediation hint shown next to failed days
    pub fn suggestion(&self) -> &'static str {
        match self {
            FetcherError::Transport(_) => "Check network connectivity and try again",
            FetcherError::Http { status: 401, .. } | FetcherError::Http { status: 403, .. } => {
                "Verify the subscription key"
            }
            FetcherError::Http { status: 404, .. } => {
                "Data may not be published for this day yet, or the node/region is unknown"
            }
            FetcherError::Http { status: 429, .. } => {
                "Lower --max-calls-per-window or --concurrency"
            }
            FetcherError::Http { status, .. } if *status >= 500 => {
                "Upstream service error, try again later"
            }
            FetcherError::Http { .. } => "Review the request parameters",
            FetcherError::Parse(_) => "Upstream payload changed or was empty",
            FetcherError::Cancelled => "Re-run the range to fetch the remaining days",
        }
    }
}

/// Classification of a [`FetcherError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Network-level error
    Transport,
    /// Non-200 HTTP status
    Http(u16),
    /// Payload error
    Parse,
    /// Never dispatched
    Cancelled,
}

impl ErrorKind {
    /// Stable label used in metrics and JSON output
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Http(_) => "http",
            ErrorKind::Parse => "parse",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Http(status) => write!(f, "http {status}"),
            other => f.write_str(other.label()),
        }
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Result of fetching a single day
pub type FetchOutcome = FetcherResult<Table>;

/// Fetches one calendar day of data
///
/// Implementations must be cheap to share across tasks; the scheduler holds
/// one instance behind an `Arc` for the whole batch.
#[async_trait]
pub trait DayFetcher: Send + Sync {
    /// Fetch a single day
    ///
    /// Every failure is reported through the returned [`FetchOutcome`].
    async fn fetch(&self, request: &FetchRequest) -> FetchOutcome;
}
