//! Catalog error types

use std::fmt;
use std::path::PathBuf;

use modelzoo_core::DescriptorError;
use thiserror::Error;

/// Catalog errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Catalog root missing or not a directory
    #[error("Catalog root not found: {0}")]
    RootNotFound(PathBuf),

    /// Platform directories unavailable
    #[error("Failed to determine catalog directory: {0}")]
    DirectoryError(String),

    /// Directory traversal failed
    #[error("Failed to walk catalog: {0}")]
    Walk(#[from] walkdir::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// A single record failed to load
    #[error("{}: {source}", .path.display())]
    Record {
        path: PathBuf,
        #[source]
        source: DescriptorError,
    },

    /// Record file sits directly in the catalog root
    #[error("{}: model record must live in its own directory", .0.display())]
    MisplacedRecord(PathBuf),

    /// One or more records failed to load
    #[error("{0}")]
    InvalidRecords(RecordFailures),

    /// Two records share a model name
    #[error("Duplicate model name {name}: {first} and {second}")]
    DuplicateName {
        name: String,
        first: String,
        second: String,
    },

    /// Model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Pattern matched no model
    #[error("No model matches pattern {0:?}")]
    NoMatch(String),

    /// Pattern does not compile
    #[error("Invalid model pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// JSON rendering error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Blocking task panicked or was cancelled
    #[error("Catalog task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Records that could not be loaded
#[derive(Debug, Default)]
pub struct RecordFailures(pub Vec<CatalogError>);

impl RecordFailures {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogError> {
        self.0.iter()
    }
}

impl fmt::Display for RecordFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} invalid model record(s)", self.0.len())?;
        for failure in &self.0 {
            write!(f, "\n  {failure}")?;
        }
        Ok(())
    }
}
