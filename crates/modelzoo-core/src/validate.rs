//! Semantic checks on parsed records
//!
//! Parsing already guarantees well-formed digests, URLs and labels. The rules
//! here span fields or depend on policy, and every violation is collected so
//! a maintainer sees all problems of a record at once.

use std::collections::HashSet;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::descriptor::{FileSource, Framework, ModelDescriptor, TypedSource, KNOWN_PRECISIONS};
use crate::error::{IssueKind, ValidationErrors, ValidationIssue};
use crate::postprocessing::Postprocessing;

/// Rules that can be tuned per catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    /// URL schemes accepted for sources and licenses
    pub allowed_schemes: Vec<String>,
    /// Reject IR files outside a known precision directory
    pub require_known_precisions: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            allowed_schemes: vec!["http".to_string(), "https".to_string()],
            require_known_precisions: true,
        }
    }
}

/// Check a record, reporting every issue found
pub fn validate(
    descriptor: &ModelDescriptor,
    policy: &ValidationPolicy,
) -> Result<(), ValidationErrors> {
    let mut issues = Vec::new();

    if descriptor.description.trim().is_empty() {
        issues.push(ValidationIssue::new("description", IssueKind::EmptyDescription));
    }

    check_url("license", &descriptor.license, policy, &mut issues);

    if descriptor.files.is_empty() {
        issues.push(ValidationIssue::new("files", IssueKind::NoFiles));
    }

    let mut seen = HashSet::new();
    for (i, file) in descriptor.files.iter().enumerate() {
        let field = |name: &str| format!("files[{i}].{name}");

        if file.size == 0 {
            issues.push(ValidationIssue::new(field("size"), IssueKind::ZeroSize));
        }

        match check_relative_path(&file.name) {
            Err(reason) => issues.push(ValidationIssue::new(
                field("name"),
                IssueKind::InvalidFileName {
                    name: file.name.clone(),
                    reason,
                },
            )),
            Ok(()) => {
                if !seen.insert(file.name.as_str()) {
                    issues.push(ValidationIssue::new(
                        field("name"),
                        IssueKind::DuplicateFileName(file.name.clone()),
                    ));
                }

                if descriptor.framework == Framework::Dldt {
                    check_precision(&file.name, policy, &field("name"), &mut issues);
                }
            }
        }

        check_source(&file.source, policy, &field("source"), &mut issues);
    }

    for (i, step) in descriptor.postprocessing.iter().enumerate() {
        if descriptor.file(step.file()).is_none() {
            issues.push(ValidationIssue::new(
                format!("postprocessing[{i}].file"),
                IssueKind::UnknownFile(step.file().to_string()),
            ));
        }

        if let Postprocessing::RegexReplace(replace) = step {
            if let Err(e) = regex::Regex::new(&replace.pattern) {
                issues.push(ValidationIssue::new(
                    format!("postprocessing[{i}].pattern"),
                    IssueKind::InvalidRegex {
                        pattern: replace.pattern.clone(),
                        message: e.to_string(),
                    },
                ));
            }
        }
    }

    for (i, arg) in descriptor.model_optimizer_args.iter().enumerate() {
        if arg.trim().is_empty() {
            issues.push(ValidationIssue::new(
                format!("model_optimizer_args[{i}]"),
                IssueKind::EmptyOptimizerArg,
            ));
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors { issues })
    }
}

/// A file name must stay inside the model directory
fn check_relative_path(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("empty path");
    }
    if name.contains('\\') {
        return Err("backslash in path");
    }

    let path = Path::new(name);
    if path.is_absolute() {
        return Err("absolute path");
    }

    for component in path.components() {
        match component {
            Component::Normal(_) => {}
            Component::ParentDir => return Err("parent directory reference"),
            Component::CurDir => return Err("current directory reference"),
            Component::RootDir | Component::Prefix(_) => return Err("absolute path"),
        }
    }

    // Path::components folds "a//b" and "a/./b"; the raw text must not.
    if name.split('/').any(|part| part.is_empty() || part == ".") {
        return Err("empty or current directory component");
    }

    Ok(())
}

fn check_precision(
    name: &str,
    policy: &ValidationPolicy,
    field: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    let precision = match name.split_once('/') {
        Some((precision, rest)) if !rest.contains('/') => precision,
        _ => {
            issues.push(ValidationIssue::new(
                field,
                IssueKind::MissingPrecision(name.to_string()),
            ));
            return;
        }
    };

    if policy.require_known_precisions && !KNOWN_PRECISIONS.contains(&precision) {
        issues.push(ValidationIssue::new(
            field,
            IssueKind::UnknownPrecision(precision.to_string()),
        ));
    }
}

fn check_source(
    source: &FileSource,
    policy: &ValidationPolicy,
    field: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    if let FileSource::Typed(TypedSource::GoogleDrive { id }) = source {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            issues.push(ValidationIssue::new(field, IssueKind::InvalidDriveId(id.clone())));
            return;
        }
    }

    match source.resolve() {
        Ok(url) => check_url(field, &url, policy, issues),
        Err(e) => issues.push(ValidationIssue::new(
            field,
            IssueKind::UnresolvableSource(e.to_string()),
        )),
    }
}

fn check_url(field: &str, url: &Url, policy: &ValidationPolicy, issues: &mut Vec<ValidationIssue>) {
    if !policy.allowed_schemes.iter().any(|s| s == url.scheme()) {
        issues.push(ValidationIssue::new(
            field,
            IssueKind::UnsupportedScheme(url.scheme().to_string()),
        ));
    } else if url.host_str().map_or(true, str::is_empty) {
        issues.push(ValidationIssue::new(field, IssueKind::MissingHost));
    }
}
