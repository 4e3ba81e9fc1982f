//! Fetch command implementation

use crate::downloader::config::{
    DEFAULT_CONCURRENCY, DEFAULT_MAX_CALLS_PER_WINDOW, MAX_CONCURRENCY, MAX_RETRIES,
};
use crate::downloader::{
    BatchJob, BatchOptions, BatchResult, BatchScheduler, DownloadError, ProgressSink, RetryPolicy,
};
use crate::fetcher::miso_config::DEFAULT_BASE_URL;
use crate::fetcher::miso_http::MisoHttpFetcher;
use crate::output::csv::write_table_csv;
use crate::output::path::OutputPathBuilder;
use crate::shutdown::SharedShutdown;
use crate::{Dataset, DateRange, NodeIdentifier};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::CliError;

/// Environment variable holding the subscription key
pub const API_KEY_ENV: &str = "MISO_API_KEY";

/// Optional separate key for the load forecast product
pub const LOAD_API_KEY_ENV: &str = "MISO_LOAD_API_KEY";

/// Parse and validate concurrency value
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "concurrency {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}

/// MISO Data Downloader CLI
#[derive(Parser, Debug)]
#[command(name = "miso-data-downloader")]
#[command(about = "Download MISO market data one day at a time under the API call quota", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Number of concurrent day fetches (default: 4, max: 32)
    ///
    /// All workers share the same call quota, so raising this mostly helps
    /// when individual requests are slow.
    #[arg(long, global = true, default_value_t = DEFAULT_CONCURRENCY, value_parser = parse_concurrency)]
    pub concurrency: usize,

    /// Calls allowed before dispatching pauses for one window
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_CALLS_PER_WINDOW, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_calls_per_window: u32,

    /// Length of the quota window in seconds
    #[arg(long, global = true, default_value_t = 60)]
    pub window_secs: u64,

    /// Retries per day for transient failures (default: 0, max: 10)
    ///
    /// Every retry is an extra call against the upstream quota.
    #[arg(long, global = true, default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..=MAX_RETRIES as i64))]
    pub max_retries: u32,

    /// API base URL
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9000)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Scheduling options from the global flags
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            concurrency: self.concurrency,
            max_calls_per_window: self.max_calls_per_window,
            window: Duration::from_secs(self.window_secs),
        }
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a date range for one node or region
    Fetch(FetchArgs),

    /// List datasets and known nodes/regions
    Sources(super::SourcesCommand),

    /// Validate identifiers or date ranges offline
    Validate(super::ValidateCommand),
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Dataset: day-ahead, real-time or load
    pub dataset: Dataset,

    /// Pricing node (e.g., MINN.HUB) or load region (e.g., North)
    #[arg(long = "node", visible_alias = "region")]
    pub identifier: String,

    /// First day (YYYY-MM-DD)
    #[arg(long)]
    pub start: String,

    /// Last day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub end: String,

    /// Subscription key (falls back to MISO_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// CSV output path (default: {data-dir}/{dataset}/{node}/...)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Data root directory used when --output is not given
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

/// Pick the subscription key: explicit flag, then the dataset-specific
/// variable (load only), then [`API_KEY_ENV`]
pub fn resolve_api_key(
    explicit: Option<&str>,
    dataset: Dataset,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, CliError> {
    let from_env = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    explicit
        .map(str::to_string)
        .filter(|v| !v.trim().is_empty())
        .or_else(|| {
            if dataset == Dataset::LoadForecast {
                from_env(LOAD_API_KEY_ENV)
            } else {
                None
            }
        })
        .or_else(|| from_env(API_KEY_ENV))
        .ok_or_else(|| {
            CliError::ConfigurationError(format!(
                "No API key: pass --api-key or set {API_KEY_ENV}"
            ))
        })
}

impl FetchArgs {
    /// Run the batch, write the CSV, and print a summary
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<(), CliError> {
        let range = DateRange::parse(&self.start, &self.end).map_err(CliError::InvalidArgument)?;
        let identifier = NodeIdentifier::parse(&self.identifier)?;
        let api_key = resolve_api_key(self.api_key.as_deref(), self.dataset, |name| {
            std::env::var(name).ok()
        })?;

        let job = BatchJob::new(self.dataset, range, identifier, api_key)
            .with_options(cli.batch_options());
        let output_path = self.output_path(&job);

        let fetcher = MisoHttpFetcher::new()
            .with_base_url(cli.base_url.clone())
            .with_retry_policy(RetryPolicy::bounded(cli.max_retries));
        let scheduler = BatchScheduler::new(Arc::new(fetcher)).with_shutdown(shutdown.clone());

        let progress = BarProgress::new(&job, cli.output_format);

        info!(
            "Starting {} fetch: {} from {} to {}",
            job.dataset,
            job.identifier,
            job.range.start(),
            job.range.end()
        );

        let result = scheduler.run_batch(&job, &progress).await;
        progress.finish();

        let result = match result {
            Ok(batch) => {
                let rows = write_table_csv(&output_path, &batch.table)?;
                info!(rows = rows, path = %output_path.display(), "CSV written");
                if shutdown.is_shutdown_requested() {
                    warn!("Batch interrupted; undispatched days are listed as cancelled");
                }
                Ok(batch)
            }
            Err(e) => Err(e),
        };

        match cli.output_format {
            OutputFormat::Json => println!("{}", summary_json(&job, &result, &output_path)),
            OutputFormat::Human => output_human(&job, &result, &output_path),
        }

        result.map(|_| ()).map_err(CliError::DownloadError)
    }

    fn output_path(&self, job: &BatchJob) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => OutputPathBuilder::new(
                self.data_dir.clone(),
                job.dataset,
                &job.identifier,
                job.range,
            )
            .build(),
        }
    }
}

/// One-line JSON summary of a batch
pub fn summary_json(
    job: &BatchJob,
    result: &Result<BatchResult, DownloadError>,
    output_path: &Path,
) -> Value {
    let failed = match result {
        Ok(batch) => batch.failed.as_slice(),
        Err(DownloadError::NoData { failed }) => failed.as_slice(),
        Err(_) => &[],
    };
    let failed_days: Vec<Value> = failed
        .iter()
        .map(|f| {
            json!({
                "date": f.date.to_string(),
                "kind": f.error.kind().label(),
                "error": f.error.to_string(),
            })
        })
        .collect();

    let (success, rows, succeeded, throttle_waits, path, err) = match result {
        Ok(batch) => (
            true,
            batch.table.len(),
            batch.succeeded,
            batch.throttle_waits,
            Some(output_path.display().to_string()),
            None,
        ),
        Err(e) => (false, 0, 0, 0, None, Some(e.to_string())),
    };

    json!({
        "success": success,
        "dataset": job.dataset.as_str(),
        "identifier": job.identifier.as_str(),
        "start": job.range.start().to_string(),
        "end": job.range.end().to_string(),
        "days": job.total_days(),
        "succeeded_days": succeeded,
        "failed_days": failed_days,
        "rows": rows,
        "throttle_waits": throttle_waits,
        "output_path": path,
        "error": err,
    })
}

fn output_human(job: &BatchJob, result: &Result<BatchResult, DownloadError>, output_path: &Path) {
    match result {
        Ok(batch) => {
            println!("\nFetch completed!");
            println!("Dataset: {} {}", job.dataset, job.identifier);
            println!("Range: {} ({} days)", job.range, job.total_days());
            println!("Output: {}", output_path.display());
            println!("Rows: {}", batch.table.len());
            println!("Days fetched: {}", batch.succeeded);
            if batch.throttle_waits > 0 {
                println!("Quota pauses: {}", batch.throttle_waits);
            }
            if !batch.failed.is_empty() {
                println!("Failed days: {}", batch.failed.len());
                for failed in &batch.failed {
                    println!(
                        "  {} - {} ({})",
                        failed.date,
                        failed.error,
                        failed.error.suggestion()
                    );
                }
            }
        }
        Err(e) => {
            eprintln!("\nFetch failed!");
            eprintln!("Error: {e}");
            if let DownloadError::NoData { failed } = e {
                for failed in failed {
                    eprintln!("  {} - {}", failed.date, failed.error);
                }
            }
            error!("Fetch failed: {}", e);
        }
    }
}

// ─── Progress bar ────────────────────────────────────────────────────────────

/// Progress bar fed by the scheduler's per-day callbacks
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new(job: &BatchJob, format: OutputFormat) -> Self {
        let bar = if format == OutputFormat::Json {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(job.total_days() as u64)
        };

        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} days ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_message(format!("Fetching {} {}", job.dataset, job.identifier));

        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for BarProgress {
    fn on_progress(&self, completed: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(completed as u64);
    }
}
