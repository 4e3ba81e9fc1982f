//! CLI command for listing available datasets and their known nodes/regions

use crate::registry::{DatasetRegistry, RegistryEntry};
use crate::Dataset;
use anyhow::{Context, Result};
use clap::Args;
use serde_json::{json, Value};

/// Sources subcommand
#[derive(Debug, Args)]
pub struct SourcesCommand {
    #[command(subcommand)]
    action: SourcesAction,
}

/// Sources actions
#[derive(Debug, clap::Subcommand)]
enum SourcesAction {
    /// List datasets with their known identifiers
    List {
        /// Optional identifier pattern (supports wildcards, e.g. "*.HUB")
        pattern: Option<String>,

        /// Restrict the listing to one dataset
        #[arg(long)]
        dataset: Option<Dataset>,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },
}

/// Output format for sources command
#[derive(Debug, Clone, clap::ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

impl SourcesCommand {
    /// Execute the sources command
    pub fn execute(&self) -> Result<()> {
        match &self.action {
            SourcesAction::List {
                pattern,
                dataset,
                format,
            } => self.execute_list(pattern.as_deref(), *dataset, format),
        }
    }

    fn execute_list(
        &self,
        pattern: Option<&str>,
        dataset: Option<Dataset>,
        format: &OutputFormat,
    ) -> Result<()> {
        let registry = DatasetRegistry::load_embedded()?;
        let listing = list_sources(&registry, dataset, pattern)?;

        match format {
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&listing)
                        .context("Failed to serialize sources to JSON")?
                );
            }
            OutputFormat::Human => {
                for entry in &listing {
                    println!(
                        "{} | {} | {} by {}",
                        entry["dataset"].as_str().unwrap_or_default(),
                        entry["description"].as_str().unwrap_or_default(),
                        entry["time_resolution"].as_str().unwrap_or_default(),
                        entry["identifier_kind"].as_str().unwrap_or_default(),
                    );
                    if let Some(ids) = entry["identifiers"].as_array() {
                        for id in ids {
                            println!("    {}", id.as_str().unwrap_or_default());
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Registry entries as JSON, optionally filtered by dataset and pattern
///
/// With a pattern, datasets with no matching identifier are left out; an
/// error is returned only when nothing matches at all.
pub fn list_sources(
    registry: &DatasetRegistry,
    dataset: Option<Dataset>,
    pattern: Option<&str>,
) -> Result<Vec<Value>> {
    let entries: Vec<&RegistryEntry> = registry
        .entries()
        .into_iter()
        .filter(|e| dataset.map_or(true, |d| e.dataset() == d))
        .collect();

    let mut listing = Vec::new();
    let mut last_error = None;

    for entry in entries {
        let identifiers: Vec<String> = match pattern {
            Some(p) => match registry.resolve_pattern(entry.dataset(), p) {
                Ok(ids) => ids.into_iter().map(|id| id.to_string()).collect(),
                Err(e) => {
                    last_error = Some(e);
                    continue;
                }
            },
            None => entry.known_identifiers().to_vec(),
        };

        listing.push(json!({
            "dataset": entry.dataset().as_str(),
            "description": entry.description(),
            "identifier_kind": entry.identifier_kind(),
            "time_resolution": entry.time_resolution(),
            "identifiers": identifiers,
        }));
    }

    if listing.is_empty() {
        if let Some(e) = last_error {
            return Err(e.into());
        }
    }

    Ok(listing)
}
