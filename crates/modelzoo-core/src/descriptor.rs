//! Model artifact record types
//!
//! A record describes the files making up one pre-trained model, where to
//! fetch them and how to check them. Records are read-only once authored; a
//! revised model gets a new record.

use std::collections::BTreeSet;
use std::fmt;
use std::io::Read;
use std::str::FromStr;

use serde::de::value::MapAccessDeserializer;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::checksum::Sha256Digest;
use crate::error::DescriptorError;
use crate::postprocessing::Postprocessing;
use crate::validate::{validate, ValidationPolicy};

/// Precisions a converter produces for non-IR frameworks
pub const CONVERTED_PRECISIONS: [&str; 2] = ["FP16", "FP32"];

/// Precisions produced by quantizing a converted model
pub const QUANTIZED_PRECISIONS: [&str; 2] = ["FP16-INT8", "FP32-INT8"];

/// Precision directories allowed in IR (`dldt`) records
pub const KNOWN_PRECISIONS: [&str; 6] = [
    "FP16",
    "FP16-INT1",
    "FP16-INT8",
    "FP32",
    "FP32-INT1",
    "FP32-INT8",
];

/// Defines a closed label enum with snake_case YAML names.
macro_rules! label_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            /// Every label, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Label as written in records
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok($name::$variant),)+
                    other => Err(format!("unknown {}: {}", stringify!($name), other)),
                }
            }
        }
    };
}

label_enum! {
    /// What a model is trained to do
    TaskType {
        ActionRecognition => "action_recognition",
        BackgroundMatting => "background_matting",
        Classification => "classification",
        Colorization => "colorization",
        Detection => "detection",
        FaceRecognition => "face_recognition",
        FeatureExtraction => "feature_extraction",
        HeadPoseEstimation => "head_pose_estimation",
        HumanPoseEstimation => "human_pose_estimation",
        ImageInpainting => "image_inpainting",
        ImageProcessing => "image_processing",
        ImageTranslation => "image_translation",
        InstanceSegmentation => "instance_segmentation",
        MachineTranslation => "machine_translation",
        MonocularDepthEstimation => "monocular_depth_estimation",
        NamedEntityRecognition => "named_entity_recognition",
        NoiseSuppression => "noise_suppression",
        ObjectAttributes => "object_attributes",
        OpticalCharacterRecognition => "optical_character_recognition",
        PlaceRecognition => "place_recognition",
        QuestionAnswering => "question_answering",
        SalientObjectDetection => "salient_object_detection",
        SemanticSegmentation => "semantic_segmentation",
        SoundClassification => "sound_classification",
        SpeechRecognition => "speech_recognition",
        StyleTransfer => "style_transfer",
        TextPrediction => "text_prediction",
        TextSpotting => "text_spotting",
        TextToSpeech => "text_to_speech",
        TimeSeries => "time_series",
        TokenRecognition => "token_recognition",
    }
}

label_enum! {
    /// Training framework the artifacts come from
    Framework {
        Caffe => "caffe",
        Caffe2 => "caffe2",
        Dldt => "dldt",
        Mxnet => "mxnet",
        Onnx => "onnx",
        Paddle => "paddle",
        Pytorch => "pytorch",
        Tf => "tf",
    }
}

/// Typed download source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "$type", rename_all = "snake_case", deny_unknown_fields)]
pub enum TypedSource {
    /// Plain HTTP(S) location
    Http { url: Url },
    /// File hosted on Google Drive
    GoogleDrive { id: String },
}

/// Where a file is fetched from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FileSource {
    /// Bare URL string
    Url(Url),
    /// `$type`-tagged mapping
    Typed(TypedSource),
}

impl FileSource {
    /// Resolve to the URL the bytes are served from
    pub fn resolve(&self) -> Result<Url, url::ParseError> {
        match self {
            FileSource::Url(url) | FileSource::Typed(TypedSource::Http { url }) => Ok(url.clone()),
            FileSource::Typed(TypedSource::GoogleDrive { id }) => Url::parse_with_params(
                "https://docs.google.com/uc",
                &[("export", "download"), ("id", id.as_str())],
            ),
        }
    }
}

// A string is a bare URL, a mapping is a typed source
impl<'de> Deserialize<'de> for FileSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SourceVisitor;

        impl<'de> Visitor<'de> for SourceVisitor {
            type Value = FileSource;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a URL string or a `$type` mapping")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<FileSource, E> {
                Url::parse(value)
                    .map(FileSource::Url)
                    .map_err(|err| E::custom(format_args!("invalid URL `{value}`: {err}")))
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<FileSource, A::Error> {
                TypedSource::deserialize(MapAccessDeserializer::new(map)).map(FileSource::Typed)
            }
        }

        deserializer.deserialize_any(SourceVisitor)
    }
}

impl From<Url> for FileSource {
    fn from(url: Url) -> Self {
        FileSource::Url(url)
    }
}

/// One file of a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileRecord {
    /// Path relative to the model directory
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Expected digest of the file contents
    pub sha256: Sha256Digest,
    /// Download source
    pub source: FileSource,
}

impl FileRecord {
    /// Get human-readable size string
    pub fn size_string(&self) -> String {
        format_size(self.size)
    }

    /// Precision directory of an IR file name, e.g. `FP16` for `FP16/model.xml`
    pub fn precision(&self) -> Option<&str> {
        match self.name.split_once('/') {
            Some((precision, rest)) if !precision.is_empty() && !rest.contains('/') => {
                Some(precision)
            }
            _ => None,
        }
    }
}

/// A model artifact record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDescriptor {
    /// Human-readable description
    pub description: String,
    /// Task label
    pub task_type: TaskType,
    /// Files in the order they are listed
    pub files: Vec<FileRecord>,
    /// Steps applied to files after fetching
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub postprocessing: Vec<Postprocessing>,
    /// Converter arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub model_optimizer_args: Vec<String>,
    /// Source framework
    pub framework: Framework,
    /// Whether the converted model can be quantized
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub quantizable: bool,
    /// License text location
    pub license: Url,
}

impl ModelDescriptor {
    /// Parse a record from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self, DescriptorError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a record from a reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DescriptorError> {
        Ok(serde_yaml::from_reader(reader)?)
    }

    /// Parse a record and check it against `policy`
    pub fn parse_validated(yaml: &str, policy: &ValidationPolicy) -> Result<Self, DescriptorError> {
        let descriptor = Self::from_yaml_str(yaml)?;
        validate(&descriptor, policy)?;
        Ok(descriptor)
    }

    /// Render the record as YAML
    pub fn to_yaml_string(&self) -> Result<String, DescriptorError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Look up a file by name
    pub fn file(&self, name: &str) -> Option<&FileRecord> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Sum of all file sizes
    pub fn total_size(&self) -> u64 {
        self.files
            .iter()
            .fold(0u64, |total, f| total.saturating_add(f.size))
    }

    /// Precisions the model is available in
    pub fn precisions(&self) -> BTreeSet<String> {
        match self.framework {
            Framework::Dldt => self
                .files
                .iter()
                .filter_map(|f| f.precision())
                .map(str::to_string)
                .collect(),
            _ => CONVERTED_PRECISIONS.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Precisions obtainable by quantization
    pub fn quantization_output_precisions(&self) -> BTreeSet<String> {
        if self.quantizable {
            QUANTIZED_PRECISIONS.iter().map(|p| p.to_string()).collect()
        } else {
            BTreeSet::new()
        }
    }
}

/// Format a byte count for display
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.0} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.0} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RECORD: &str = r#"
description: >-
  Person attributes classification for a traffic scene.
task_type: object_attributes
files:
  - name: FP32/person-attributes.xml
    size: 11
    sha256: b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9
    source: https://storage.example.org/models/FP32/person-attributes.xml
  - name: FP16/person-attributes.xml
    size: 11
    sha256: B94D27B9934D3E08A52E52D7DA7DABFAC484EFE37A5380EE9088F7ACE2EFCDE9
    source:
      $type: http
      url: https://storage.example.org/models/FP16/person-attributes.xml
framework: dldt
license: https://raw.githubusercontent.com/example/zoo/master/LICENSE
"#;

    #[test]
    fn test_parse_record() {
        let record = ModelDescriptor::from_yaml_str(RECORD).unwrap();

        assert_eq!(record.task_type, TaskType::ObjectAttributes);
        assert_eq!(record.framework, Framework::Dldt);
        assert_eq!(record.files.len(), 2);
        assert_eq!(record.files[0].name, "FP32/person-attributes.xml");
        assert_eq!(record.files[0].sha256, record.files[1].sha256);
        assert_eq!(record.total_size(), 22);
        assert!(record.postprocessing.is_empty());
        assert!(!record.quantizable);
        assert_eq!(
            record.license.as_str(),
            "https://raw.githubusercontent.com/example/zoo/master/LICENSE"
        );
    }

    /// Drop a top-level key together with its indented continuation lines
    fn without_key(yaml: &str, key: &str) -> String {
        let prefix = format!("{key}:");
        let mut skipping = false;
        yaml.lines()
            .filter(|line| {
                if line.starts_with(&prefix) {
                    skipping = true;
                    return false;
                }
                if skipping && line.starts_with(' ') {
                    return false;
                }
                skipping = false;
                true
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_missing_field_is_rejected() {
        for field in ["description", "task_type", "files", "framework", "license"] {
            let yaml = without_key(RECORD, field);
            assert!(!yaml.contains(&format!("\n{field}:")), "{field} still present");

            let err = ModelDescriptor::from_yaml_str(&yaml).unwrap_err();
            assert!(matches!(err, DescriptorError::Parse(_)), "{field}: {err}");
            assert!(
                err.to_string().contains(&format!("missing field `{field}`")),
                "{field}: {err}"
            );
        }
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let yaml = format!("{RECORD}\nowner: someone\n");
        let err = ModelDescriptor::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, DescriptorError::Parse(_)));
    }

    #[test]
    fn test_unknown_task_type_is_rejected() {
        let yaml = RECORD.replace("object_attributes", "mind_reading");
        assert!(ModelDescriptor::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn test_malformed_url_is_rejected() {
        let yaml = RECORD.replace(
            "https://storage.example.org/models/FP32/person-attributes.xml",
            "not a url",
        );
        let err = ModelDescriptor::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, DescriptorError::Parse(_)), "{err}");
        assert!(err.to_string().contains("relative URL without a base"), "{err}");
    }

    #[test]
    fn test_unknown_keys_in_nested_mappings_are_rejected() {
        let stray_source = RECORD.replace(
            "      $type: http\n",
            "      $type: http\n      mirror: https://mirror.example.org/\n",
        );
        let err = ModelDescriptor::from_yaml_str(&stray_source).unwrap_err();
        assert!(matches!(err, DescriptorError::Parse(_)), "{err}");
        assert!(err.to_string().contains("mirror"), "{err}");

        let drive: Result<FileSource, _> =
            serde_yaml::from_str("$type: google_drive\nid: abc\nmirror: def");
        assert!(drive.is_err());

        let misspelled_step = format!(
            "{RECORD}postprocessing:\n  - $type: regex_replace\n    \
             file: FP32/person-attributes.xml\n    pattern: a\n    \
             replacement: b\n    cuont: 1\n"
        );
        let err = ModelDescriptor::from_yaml_str(&misspelled_step).unwrap_err();
        assert!(matches!(err, DescriptorError::Parse(_)), "{err}");
        assert!(err.to_string().contains("cuont"), "{err}");
    }

    #[test]
    fn test_negative_size_is_rejected() {
        let yaml = RECORD.replacen("size: 11", "size: -11", 1);
        assert!(ModelDescriptor::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let record = ModelDescriptor::from_yaml_str(RECORD).unwrap();
        let rendered = record.to_yaml_string().unwrap();

        assert!(!rendered.contains("postprocessing"));
        assert!(!rendered.contains("quantizable"));
        assert_eq!(ModelDescriptor::from_yaml_str(&rendered).unwrap(), record);
    }

    #[test]
    fn test_precisions() {
        let record = ModelDescriptor::from_yaml_str(RECORD).unwrap();
        let precisions: Vec<String> = record.precisions().into_iter().collect();
        assert_eq!(precisions, vec!["FP16".to_string(), "FP32".to_string()]);

        let mut converted = record.clone();
        converted.framework = Framework::Onnx;
        converted.quantizable = true;
        assert_eq!(converted.precisions().len(), 2);
        assert!(converted.quantization_output_precisions().contains("FP32-INT8"));
        assert!(record.quantization_output_precisions().is_empty());
    }

    #[test]
    fn test_google_drive_source() {
        let source: FileSource =
            serde_yaml::from_str("$type: google_drive\nid: 0B3k_dRiVe-Id").unwrap();
        assert_eq!(
            source.resolve().unwrap().as_str(),
            "https://docs.google.com/uc?export=download&id=0B3k_dRiVe-Id"
        );
    }

    #[test]
    fn test_label_round_trip() {
        for task in TaskType::ALL {
            assert_eq!(task.as_str().parse::<TaskType>().unwrap(), *task);
        }
        assert_eq!(Framework::Tf.to_string(), "tf");
        assert!("tensorflow".parse::<Framework>().is_err());
    }

    #[test]
    fn test_size_string() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024 / 2), "1.5 GB");
    }
}
