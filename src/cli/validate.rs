//! Validation subcommand

use super::CliError;
use crate::downloader::config::MAX_RANGE_DAYS;
use crate::identifier::NodeIdentifier;
use crate::registry::DatasetRegistry;
use crate::{Dataset, DateRange};
use clap::Parser;

/// Validate command for checking identifiers and date ranges without network access
#[derive(Parser, Debug)]
pub struct ValidateCommand {
    /// What to validate
    #[command(subcommand)]
    pub target: ValidateTarget,
}

/// Target type for validation
#[derive(clap::Subcommand, Debug)]
pub enum ValidateTarget {
    /// Validate a node or region identifier
    Identifier {
        /// Identifier to validate (e.g., MINN.HUB)
        identifier: String,

        /// Also check whether the dataset's registry knows it
        #[arg(long)]
        dataset: Option<Dataset>,
    },
    /// Validate a date range
    Range {
        /// First day (YYYY-MM-DD)
        start: String,
        /// Last day, inclusive (YYYY-MM-DD)
        end: String,
    },
}

impl ValidateCommand {
    /// Execute the validation command
    pub fn execute(&self) -> Result<(), CliError> {
        match &self.target {
            ValidateTarget::Identifier {
                identifier,
                dataset,
            } => self.validate_identifier(identifier, *dataset),
            ValidateTarget::Range { start, end } => self.validate_range(start, end),
        }
    }

    fn validate_identifier(&self, identifier: &str, dataset: Option<Dataset>) -> Result<(), CliError> {
        let id = match NodeIdentifier::parse(identifier) {
            Ok(id) => id,
            Err(e) => {
                eprintln!("Invalid identifier: {e}");
                return Err(e.into());
            }
        };

        println!("Valid identifier: {id}");
        println!("  Filesystem safe: {}", id.to_filesystem_safe());

        if let Some(dataset) = dataset {
            let registry = DatasetRegistry::load_embedded()?;
            if registry.is_known(dataset, &id) {
                println!("  Known {dataset} identifier");
            } else {
                println!("  Not in the {dataset} registry (the API may still accept it)");
            }
        }

        Ok(())
    }

    fn validate_range(&self, start: &str, end: &str) -> Result<(), CliError> {
        let range = DateRange::parse(start, end).map_err(|e| {
            eprintln!("Invalid range: {e}");
            CliError::InvalidArgument(e)
        })?;

        let days = range.num_days();
        if days > MAX_RANGE_DAYS {
            let msg = format!("Range spans {days} days; at most {MAX_RANGE_DAYS} are allowed");
            eprintln!("Invalid range: {msg}");
            return Err(CliError::InvalidArgument(msg));
        }

        println!("Valid range: {range}");
        println!("  Days (one request each): {days}");
        Ok(())
    }
}
