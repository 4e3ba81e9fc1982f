//! Dataset registry with known pricing nodes and load regions
//!
//! The registry is advisory: MISO publishes thousands of CPNodes, so an
//! identifier that is not listed here is still fetched, only with a warning.

use crate::identifier::NodeIdentifier;
use crate::Dataset;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Embedded registry data
const REGISTRY_JSON: &str = include_str!("datasets.json");

/// Global registry instance (loaded once)
static REGISTRY: Lazy<Result<DatasetRegistry, RegistryError>> =
    Lazy::new(|| DatasetRegistry::from_json(REGISTRY_JSON));

/// Registry of supported datasets
#[derive(Debug, Clone)]
pub struct DatasetRegistry {
    #[allow(dead_code)]
    schema_version: String,
    #[allow(dead_code)]
    last_updated: String,
    entries_map: HashMap<Dataset, RegistryEntry>,
}

impl DatasetRegistry {
    /// Load the embedded registry
    ///
    /// This is a singleton operation - the registry is loaded once and cached.
    pub fn load() -> Result<&'static Self, &'static RegistryError> {
        REGISTRY.as_ref()
    }

    /// Load embedded registry, returning an owned copy
    pub fn load_embedded() -> Result<Self, RegistryError> {
        Self::from_json(REGISTRY_JSON)
    }

    fn from_json(json: &str) -> Result<Self, RegistryError> {
        let raw: RawRegistry = serde_json::from_str(json)
            .map_err(|e| RegistryError::ParseError(format!("Failed to parse registry: {e}")))?;

        let mut entries_map = HashMap::new();
        for entry in raw.datasets {
            for id in &entry.known_identifiers {
                NodeIdentifier::parse(id).map_err(|e| {
                    RegistryError::ParseError(format!("Bad identifier '{id}' in registry: {e}"))
                })?;
            }
            entries_map.insert(entry.dataset, entry);
        }

        Ok(Self {
            schema_version: raw.schema_version,
            last_updated: raw.last_updated,
            entries_map,
        })
    }

    /// All entries in [`Dataset::ALL`] order
    pub fn entries(&self) -> Vec<&RegistryEntry> {
        Dataset::ALL
            .iter()
            .filter_map(|d| self.entries_map.get(d))
            .collect()
    }

    /// Entry for a dataset
    pub fn get_entry(&self, dataset: Dataset) -> Option<&RegistryEntry> {
        self.entries_map.get(&dataset)
    }

    /// Whether the identifier is one of the dataset's known nodes/regions
    pub fn is_known(&self, dataset: Dataset, id: &NodeIdentifier) -> bool {
        self.get_entry(dataset)
            .map(|e| e.known_identifiers.iter().any(|k| k == id.as_str()))
            .unwrap_or(false)
    }

    /// Resolve a wildcard pattern against the known identifiers of a dataset
    ///
    /// # Pattern Syntax
    /// - `*` matches any sequence of characters
    /// - `*.HUB` matches every hub
    /// - `MI*` matches `MICHIGAN.HUB` and `MINN.HUB`
    pub fn resolve_pattern(
        &self,
        dataset: Dataset,
        pattern: &str,
    ) -> Result<Vec<NodeIdentifier>, RegistryError> {
        let entry = self
            .get_entry(dataset)
            .ok_or_else(|| RegistryError::NotFound(format!("Dataset {dataset} not registered")))?;

        let matches: Vec<NodeIdentifier> = entry
            .known_identifiers
            .iter()
            .filter(|id| matches_pattern(pattern, id))
            .filter_map(|id| NodeIdentifier::parse(id).ok())
            .collect();

        if matches.is_empty() {
            return Err(RegistryError::NotFound(format!(
                "Pattern {pattern} does not match any {dataset} identifier"
            )));
        }

        Ok(matches)
    }
}

/// Match a value against a pattern where `*` matches any run of characters
fn matches_pattern(pattern: &str, value: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == value;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let (first, rest) = match parts.split_first() {
        Some(split) => split,
        None => return true,
    };
    let (last, middle) = match rest.split_last() {
        Some(split) => split,
        None => return value == *first,
    };

    if value.len() < first.len() + last.len() {
        return false;
    }
    if !value.starts_with(first) || !value.ends_with(last) {
        return false;
    }

    // Middle parts must appear in order between the anchored ends
    let mut remaining = &value[first.len()..value.len() - last.len()];
    for part in middle {
        match remaining.find(part) {
            Some(pos) => remaining = &remaining[pos + part.len()..],
            None => return false,
        }
    }

    true
}

/// A single dataset entry in the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    dataset: Dataset,
    description: String,
    identifier_kind: IdentifierKind,
    time_resolution: String,
    known_identifiers: Vec<String>,
}

impl RegistryEntry {
    /// Dataset described by this entry
    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether identifiers are pricing nodes or load regions
    pub fn identifier_kind(&self) -> IdentifierKind {
        self.identifier_kind
    }

    /// Native time resolution of the rows
    pub fn time_resolution(&self) -> &str {
        &self.time_resolution
    }

    /// Known node/region codes
    pub fn known_identifiers(&self) -> &[String] {
        &self.known_identifiers
    }
}

/// Kind of location a dataset is keyed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    /// Pricing node (e.g. `MINN.HUB`)
    Node,
    /// Load forecast region (e.g. `North`)
    Region,
}

#[derive(Debug, Deserialize)]
struct RawRegistry {
    schema_version: String,
    last_updated: String,
    datasets: Vec<RegistryEntry>,
}

/// Errors that can occur when working with the registry
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Failed to parse registry JSON
    #[error("registry parse error: {0}")]
    ParseError(String),

    /// Dataset or identifier not found in registry
    #[error("not found: {0}")]
    NotFound(String),
}
