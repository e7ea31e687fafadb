//! Model catalog loading and lookup

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use futures::{stream, StreamExt};
use globset::GlobBuilder;
use modelzoo_core::{DescriptorError, Framework, ModelDescriptor, TaskType, ValidationPolicy};
use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::CatalogConfig;
use crate::entry::{ModelEntry, ModelSummary};
use crate::error::{CatalogError, RecordFailures};

/// Immutable set of model records, keyed and ordered by model name
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    models: BTreeMap<String, ModelEntry>,
}

impl Catalog {
    /// Load every record under `config.root`
    pub fn load(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let manifests = find_manifests(config)?;
        debug!("Found {} model records under {}", manifests.len(), config.root.display());

        let results = manifests.into_iter().map(|found| match found {
            Ok(path) => match std::fs::read_to_string(&path) {
                Ok(contents) => read_entry(&config.root, path, &contents, &config.validation),
                Err(e) => Err(unreadable(path, e)),
            },
            Err(e) => Err(e),
        });

        Self::assemble(results, config)
    }

    /// Load every record under `config.root`, reading records concurrently
    pub async fn load_async(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let walk_config = config.clone();
        let manifests = tokio::task::spawn_blocking(move || find_manifests(&walk_config)).await??;
        debug!("Found {} model records under {}", manifests.len(), config.root.display());

        let results: Vec<Result<ModelEntry, CatalogError>> = stream::iter(manifests)
            .map(|found| async move {
                let path = match found {
                    Ok(path) => path,
                    Err(e) => return Err(e),
                };
                match fs::read_to_string(&path).await {
                    Ok(contents) => read_entry(&config.root, path, &contents, &config.validation),
                    Err(e) => Err(unreadable(path, e)),
                }
            })
            .buffered(config.concurrency.max(1))
            .collect()
            .await;

        Self::assemble(results, config)
    }

    /// Build a catalog from entries already in memory
    pub fn from_entries<I>(entries: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = ModelEntry>,
    {
        let mut models: BTreeMap<String, ModelEntry> = BTreeMap::new();

        for entry in entries {
            if let Some(existing) = models.get(&entry.name) {
                return Err(CatalogError::DuplicateName {
                    name: entry.name.clone(),
                    first: existing.subdirectory.display().to_string(),
                    second: entry.subdirectory.display().to_string(),
                });
            }
            models.insert(entry.name.clone(), entry);
        }

        Ok(Self { models })
    }

    fn assemble<I>(results: I, config: &CatalogConfig) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = Result<ModelEntry, CatalogError>>,
    {
        let mut entries = Vec::new();
        let mut failures = RecordFailures::default();

        for result in results {
            match result {
                Ok(entry) => entries.push(entry),
                Err(e) => failures.0.push(e),
            }
        }

        if !failures.is_empty() {
            if !config.skip_invalid {
                return Err(CatalogError::InvalidRecords(failures));
            }
            for failure in failures.iter() {
                warn!("Skipping model record: {}", failure);
            }
        }

        let catalog = Self::from_entries(entries)?;
        info!("Loaded {} models from {}", catalog.len(), config.root.display());
        Ok(catalog)
    }

    /// Get a model by name
    pub fn get(&self, name: &str) -> Option<&ModelEntry> {
        self.models.get(name)
    }

    /// Get a model by name, failing if absent
    pub fn require(&self, name: &str) -> Result<&ModelEntry, CatalogError> {
        self.get(name)
            .ok_or_else(|| CatalogError::ModelNotFound(name.to_string()))
    }

    /// All models, ordered by name
    pub fn iter(&self) -> impl Iterator<Item = &ModelEntry> {
        self.models.values()
    }

    /// All model names, ordered
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Get all models of a task type
    pub fn by_task_type(&self, task_type: TaskType) -> Vec<&ModelEntry> {
        self.iter()
            .filter(|m| m.descriptor.task_type == task_type)
            .collect()
    }

    /// Get all models from a framework
    pub fn by_framework(&self, framework: Framework) -> Vec<&ModelEntry> {
        self.iter()
            .filter(|m| m.descriptor.framework == framework)
            .collect()
    }

    /// Select models whose names match any of the glob patterns
    ///
    /// Each pattern must match at least one model. The result is ordered by
    /// name and holds each model once.
    pub fn select<S: AsRef<str>>(&self, patterns: &[S]) -> Result<Vec<&ModelEntry>, CatalogError> {
        let mut selected: BTreeMap<&str, &ModelEntry> = BTreeMap::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();
            let matcher = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|source| CatalogError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })?
                .compile_matcher();

            let before = selected.len();
            let mut matched = false;
            for (name, entry) in &self.models {
                if matcher.is_match(name) {
                    selected.insert(name.as_str(), entry);
                    matched = true;
                }
            }

            if !matched {
                return Err(CatalogError::NoMatch(pattern.to_string()));
            }
            debug!("Pattern {} added {} models", pattern, selected.len() - before);
        }

        Ok(selected.into_values().collect())
    }

    /// Summaries of all models, ordered by name
    pub fn summaries(&self) -> Vec<ModelSummary> {
        self.iter().map(ModelEntry::summary).collect()
    }

    /// Pretty JSON array of the model summaries
    pub fn to_json(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string_pretty(&self.summaries())?)
    }

    /// Get total size of all model files
    pub fn total_size(&self) -> u64 {
        self.iter()
            .fold(0u64, |total, m| total.saturating_add(m.total_size()))
    }
}

/// Paths of all record files under the root, in file name order
///
/// Only a missing root fails outright. Errors met while walking are returned
/// in place, so they count as record failures and honor `skip_invalid`.
fn find_manifests(
    config: &CatalogConfig,
) -> Result<Vec<Result<PathBuf, CatalogError>>, CatalogError> {
    if !config.root.is_dir() {
        return Err(CatalogError::RootNotFound(config.root.clone()));
    }

    let mut walker = WalkDir::new(&config.root)
        .follow_links(config.follow_links)
        .sort_by_file_name();
    if let Some(depth) = config.max_depth {
        walker = walker.max_depth(depth);
    }

    let manifest_name = OsStr::new(&config.manifest_name);
    let mut manifests = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() && entry.file_name() == manifest_name => {
                manifests.push(Ok(entry.into_path()));
            }
            Ok(_) => {}
            Err(e) => {
                debug!("Walk error under {}: {}", config.root.display(), e);
                manifests.push(Err(CatalogError::Walk(e)));
            }
        }
    }

    Ok(manifests)
}

fn unreadable(path: PathBuf, e: std::io::Error) -> CatalogError {
    CatalogError::Record {
        path,
        source: DescriptorError::Io(e),
    }
}

/// Parse one record file into an entry named after its directory
fn read_entry(
    root: &Path,
    path: PathBuf,
    contents: &str,
    policy: &ValidationPolicy,
) -> Result<ModelEntry, CatalogError> {
    let subdirectory = match path.parent().and_then(|dir| dir.strip_prefix(root).ok()) {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => return Err(CatalogError::MisplacedRecord(path)),
    };
    let name = match subdirectory.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => return Err(CatalogError::MisplacedRecord(path)),
    };

    debug!("Parsing model record {}", path.display());
    let descriptor = ModelDescriptor::parse_validated(contents, policy)
        .map_err(|source| CatalogError::Record { path, source })?;

    Ok(ModelEntry::new(name, subdirectory, descriptor))
}
