//! Catalog configuration

use std::path::PathBuf;

use directories::ProjectDirs;
use modelzoo_core::ValidationPolicy;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Environment variable overriding the catalog root
pub const CATALOG_ROOT_ENV: &str = "MODELZOO_CATALOG_ROOT";

/// Default record file name
pub const DEFAULT_MANIFEST_NAME: &str = "model.yml";

/// How a catalog is located and loaded
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directory holding one subdirectory per model
    pub root: PathBuf,
    /// Record file name looked for under `root`
    pub manifest_name: String,
    /// Follow symbolic links while walking
    pub follow_links: bool,
    /// Maximum walk depth below `root`
    pub max_depth: Option<usize>,
    /// Log and skip broken records instead of failing
    pub skip_invalid: bool,
    /// Records read at once by `Catalog::load_async`
    pub concurrency: usize,
    /// Semantic rules applied to every record
    pub validation: ValidationPolicy,
}

impl CatalogConfig {
    /// Create a config for the platform data directory
    ///
    /// `MODELZOO_CATALOG_ROOT` takes precedence when set.
    pub fn new() -> Result<Self, CatalogError> {
        if let Some(root) = std::env::var_os(CATALOG_ROOT_ENV) {
            return Ok(Self::with_root(PathBuf::from(root)));
        }

        let dirs = ProjectDirs::from("org", "modelzoo", "ModelZoo").ok_or_else(|| {
            CatalogError::DirectoryError("Could not determine data directory".to_string())
        })?;

        Ok(Self::with_root(dirs.data_dir().join("models")))
    }

    /// Create a config for a custom root
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Skip broken records instead of failing the whole load
    pub fn skip_invalid(mut self, skip: bool) -> Self {
        self.skip_invalid = skip;
        self
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("models"),
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            follow_links: false,
            max_depth: None,
            skip_invalid: false,
            concurrency: 8,
            validation: ValidationPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: CatalogConfig =
            serde_json::from_str(r#"{ "root": "/srv/zoo", "skip_invalid": true }"#).unwrap();

        assert_eq!(config.root, PathBuf::from("/srv/zoo"));
        assert!(config.skip_invalid);
        assert_eq!(config.manifest_name, "model.yml");
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.validation, ValidationPolicy::default());
    }

    #[test]
    fn test_with_root() {
        let config = CatalogConfig::with_root("/tmp/zoo").skip_invalid(true);
        assert_eq!(config.root, PathBuf::from("/tmp/zoo"));
        assert!(config.skip_invalid);
        assert!(!config.follow_links);
    }
}
