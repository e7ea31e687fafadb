//! Postprocessing steps declared by a record

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PostprocessingError;

/// Archive container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFormat {
    Zip,
    Tar,
    Gztar,
    Bztar,
    Xztar,
}

/// Regex substitution over a text file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegexReplace {
    /// Target file name
    pub file: String,
    /// Pattern to search for
    pub pattern: String,
    /// Replacement, may use `$1` style group references
    pub replacement: String,
    /// Maximum number of replacements, 0 for all
    #[serde(default)]
    pub count: usize,
}

impl RegexReplace {
    /// Compile the pattern
    pub fn regex(&self) -> Result<Regex, PostprocessingError> {
        Regex::new(&self.pattern).map_err(|source| PostprocessingError::InvalidPattern {
            pattern: self.pattern.clone(),
            source,
        })
    }

    /// Apply the substitution to `text`
    ///
    /// A pattern that matches nothing is an error, since it means the file
    /// is not the one the record was written against.
    pub fn apply(&self, text: &str) -> Result<String, PostprocessingError> {
        let regex = self.regex()?;
        if !regex.is_match(text) {
            return Err(PostprocessingError::NoMatch(self.pattern.clone()));
        }

        Ok(regex
            .replacen(text, self.count, self.replacement.as_str())
            .into_owned())
    }
}

/// Archive extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnpackArchive {
    /// Archive file name
    pub file: String,
    /// Container format
    pub format: ArchiveFormat,
}

/// A postprocessing step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "$type", rename_all = "snake_case")]
pub enum Postprocessing {
    RegexReplace(RegexReplace),
    UnpackArchive(UnpackArchive),
}

impl Postprocessing {
    /// File the step operates on
    pub fn file(&self) -> &str {
        match self {
            Postprocessing::RegexReplace(step) => &step.file,
            Postprocessing::UnpackArchive(step) => &step.file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replace(pattern: &str, replacement: &str, count: usize) -> RegexReplace {
        RegexReplace {
            file: "model.prototxt".to_string(),
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
            count,
        }
    }

    #[test]
    fn test_replace_all_by_default() {
        let step = replace(r"dim: (\d+)", "dim: 1", 0);
        assert_eq!(step.apply("dim: 10\ndim: 3\n").unwrap(), "dim: 1\ndim: 1\n");
    }

    #[test]
    fn test_replace_with_count_and_groups() {
        let step = replace(r"layer_(\d+)", "block_$1", 1);
        assert_eq!(step.apply("layer_1 layer_2").unwrap(), "block_1 layer_2");
    }

    #[test]
    fn test_no_match_is_error() {
        let step = replace("absent", "", 0);
        assert!(matches!(step.apply("text"), Err(PostprocessingError::NoMatch(_))));
    }

    #[test]
    fn test_bad_pattern() {
        let step = replace("(unclosed", "", 0);
        assert!(matches!(
            step.apply("text"),
            Err(PostprocessingError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_parse_steps() {
        let yaml = r#"
- $type: regex_replace
  file: deploy.prototxt
  pattern: 'engine: CUDNN'
  replacement: ''
- $type: unpack_archive
  file: weights.tar.gz
  format: gztar
"#;
        let steps: Vec<Postprocessing> = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].file(), "deploy.prototxt");
        match &steps[1] {
            Postprocessing::UnpackArchive(step) => assert_eq!(step.format, ArchiveFormat::Gztar),
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_step_keys() {
        let replace = "$type: regex_replace\nfile: a.txt\npattern: x\nreplacement: y\ncuont: 1";
        let err = serde_yaml::from_str::<Postprocessing>(replace).unwrap_err();
        assert!(err.to_string().contains("cuont"), "{err}");

        let unpack = "$type: unpack_archive\nfile: w.tar\nformat: tar\nstrip: 1";
        let err = serde_yaml::from_str::<Postprocessing>(unpack).unwrap_err();
        assert!(err.to_string().contains("strip"), "{err}");
    }
}
