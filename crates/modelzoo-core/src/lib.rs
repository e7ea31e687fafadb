//! modelzoo-core - model artifact records
//!
//! Schema types for the YAML records describing pre-trained model files,
//! along with their validation rules and byte-level integrity checks.

pub mod checksum;
pub mod descriptor;
pub mod error;
pub mod integrity;
pub mod postprocessing;
pub mod validate;

pub use checksum::Sha256Digest;
pub use descriptor::{
    format_size, FileRecord, FileSource, Framework, ModelDescriptor, TaskType, TypedSource,
};
pub use error::{
    DescriptorError, DigestError, IntegrityError, IssueKind, PostprocessingError,
    ValidationErrors, ValidationIssue,
};
pub use integrity::IntegrityCheck;
pub use postprocessing::{ArchiveFormat, Postprocessing, RegexReplace, UnpackArchive};
pub use validate::{validate, ValidationPolicy};
