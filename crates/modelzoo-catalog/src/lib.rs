//! Model artifact catalog
//!
//! Discovers the `model.yml` records under a catalog root, names each model
//! after its directory and offers lookups, filters and JSON summaries.

pub mod catalog;
pub mod config;
pub mod entry;
pub mod error;

pub use catalog::Catalog;
pub use config::{CatalogConfig, CATALOG_ROOT_ENV, DEFAULT_MANIFEST_NAME};
pub use entry::{ModelEntry, ModelSummary};
pub use error::{CatalogError, RecordFailures};
