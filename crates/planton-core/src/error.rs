use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("manifest is empty")]
    Empty,

    #[error("manifest must be a YAML mapping")]
    NotAMapping,

    #[error("{0}")]
    UnsupportedKind(String),

    #[error("invalid override '{0}': expected key=value")]
    InvalidOverride(String),

    #[error("cannot apply override '{key}': {reason}")]
    OverrideConflict { key: String, reason: String },

    #[error("manifest validation failed:\n{}", .0.iter().map(|v| format!("  - {v}")).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),

    #[error("invalid label {label}: {reason}")]
    InvalidLabel { label: String, reason: String },

    #[error("unsupported manifest content: {0}")]
    Unsupported(String),

    #[error("stack input has no 'target' field")]
    MissingTarget,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ManifestError>;
