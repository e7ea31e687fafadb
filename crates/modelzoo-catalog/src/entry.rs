//! Catalog entries and their summaries

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use modelzoo_core::{format_size, Framework, ModelDescriptor, TaskType};
use serde::{Deserialize, Serialize};

/// A record together with where it sits in the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEntry {
    /// Model name, taken from the record's directory
    pub name: String,
    /// Record directory relative to the catalog root
    pub subdirectory: PathBuf,
    /// Parsed record
    pub descriptor: ModelDescriptor,
}

impl ModelEntry {
    pub fn new(
        name: impl Into<String>,
        subdirectory: impl Into<PathBuf>,
        descriptor: ModelDescriptor,
    ) -> Self {
        Self {
            name: name.into(),
            subdirectory: subdirectory.into(),
            descriptor,
        }
    }

    /// Total size of the model files
    pub fn total_size(&self) -> u64 {
        self.descriptor.total_size()
    }

    /// Get human-readable size string
    pub fn size_string(&self) -> String {
        format_size(self.total_size())
    }

    /// Flattened view for listings and JSON output
    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            name: self.name.clone(),
            description: self.descriptor.description.clone(),
            framework: self.descriptor.framework,
            license_url: self.descriptor.license.to_string(),
            precisions: self.descriptor.precisions(),
            quantization_output_precisions: self.descriptor.quantization_output_precisions(),
            subdirectory: slash_path(&self.subdirectory),
            task_type: self.descriptor.task_type,
            total_size: self.total_size(),
        }
    }
}

/// Model information for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub name: String,
    pub description: String,
    pub framework: Framework,
    pub license_url: String,
    pub precisions: BTreeSet<String>,
    pub quantization_output_precisions: BTreeSet<String>,
    pub subdirectory: String,
    pub task_type: TaskType,
    pub total_size: u64,
}

/// Render a relative path with `/` separators on every platform
fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
