//! Record error types

use std::fmt;

use thiserror::Error;

use crate::checksum::Sha256Digest;

/// Errors raised while reading or writing a record
#[derive(Error, Debug)]
pub enum DescriptorError {
    /// YAML syntax or schema error
    #[error("Failed to parse model record: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record parsed but breaks a semantic rule
    #[error("Invalid model record: {0}")]
    Invalid(#[from] ValidationErrors),
}

/// Malformed SHA-256 hex string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    #[error("expected 64 hex characters, got {0}")]
    Length(usize),

    #[error("invalid hex character {0:?}")]
    NonHex(char),
}

/// Bytes that do not match their file record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("{file}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        file: String,
        expected: u64,
        actual: u64,
    },

    #[error("{file}: checksum mismatch, expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: Sha256Digest,
        actual: Sha256Digest,
    },
}

/// Postprocessing step failures
#[derive(Error, Debug)]
pub enum PostprocessingError {
    /// Pattern does not compile
    #[error("Invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Pattern has nothing to replace
    #[error("Pattern {0:?} did not match")]
    NoMatch(String),
}

/// A single semantic problem found in a record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    #[error("description is empty")]
    EmptyDescription,

    #[error("record lists no files")]
    NoFiles,

    #[error("size must be positive")]
    ZeroSize,

    #[error("invalid file name {name:?}: {reason}")]
    InvalidFileName { name: String, reason: &'static str },

    #[error("duplicate file name {0:?}")]
    DuplicateFileName(String),

    #[error("URL scheme {0:?} is not allowed")]
    UnsupportedScheme(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("unresolvable source URL: {0}")]
    UnresolvableSource(String),

    #[error("invalid Google Drive id {0:?}")]
    InvalidDriveId(String),

    #[error("cannot derive precision from file name {0:?}")]
    MissingPrecision(String),

    #[error("unknown precision {0:?}")]
    UnknownPrecision(String),

    #[error("postprocessing refers to undeclared file {0:?}")]
    UnknownFile(String),

    #[error("invalid regex {pattern:?}: {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("empty model optimizer argument")]
    EmptyOptimizerArg,
}

/// An issue and the field it was found on, e.g. `files[1].size`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub kind: IssueKind,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, kind: IssueKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.kind)
    }
}

/// Every issue found in one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationErrors {
    /// Whether an issue of the given kind was reported on `field`
    pub fn has(&self, field: &str, kind: &IssueKind) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.field == field && &issue.kind == kind)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.issues.iter().map(ToString::to_string).collect();
        f.write_str(&rendered.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}
