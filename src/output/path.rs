//! Default output file naming
//!
//! Layout: `{root}/{dataset}/{identifier}/{dataset}_{identifier}_{start}_{end}.csv`
//! where the identifier is in its filesystem-safe form.

use crate::{Dataset, DateRange, NodeIdentifier};
use std::path::PathBuf;

use super::OutputError;

/// Path builder for hierarchical file organization
pub struct OutputPathBuilder {
    root_dir: PathBuf,
    dataset: Dataset,
    identifier: String,
    range: DateRange,
}

impl OutputPathBuilder {
    /// Create a new path builder
    ///
    /// # Arguments
    ///
    /// * `root_dir` - Root data directory (e.g., "data" or "/var/data")
    /// * `dataset` - Dataset being written
    /// * `identifier` - Node or region; sanitized for the filesystem
    /// * `range` - Days covered by the file
    pub fn new(
        root_dir: PathBuf,
        dataset: Dataset,
        identifier: &NodeIdentifier,
        range: DateRange,
    ) -> Self {
        Self {
            root_dir,
            dataset,
            identifier: identifier.to_filesystem_safe(),
            range,
        }
    }

    /// Directory that holds the file
    pub fn directory(&self) -> PathBuf {
        self.root_dir
            .join(self.dataset.as_str())
            .join(&self.identifier)
    }

    /// File name without directory
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}_{}.csv",
            self.dataset.as_str().replace('-', "_"),
            self.identifier,
            self.range.start(),
            self.range.end()
        )
    }

    /// Build the complete file path
    pub fn build(&self) -> PathBuf {
        self.directory().join(self.file_name())
    }

    /// Ensure the dataset and identifier directories exist
    pub fn ensure_directories(&self) -> Result<(), OutputError> {
        let dir_path = self.directory();
        std::fs::create_dir_all(&dir_path).map_err(|e| {
            OutputError::IoError(format!(
                "Failed to create directory {}: {}",
                dir_path.display(),
                e
            ))
        })?;
        Ok(())
    }
}
