use crate::module::LocalModuleError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IacError {
    #[error(transparent)]
    Manifest(#[from] planton_core::ManifestError),

    #[error("Staging error: {0}")]
    Staging(#[from] planton_staging::StagingError),

    #[error("Config error: {0}")]
    Config(#[from] planton_config::ConfigError),

    #[error(transparent)]
    LocalModule(#[from] Box<LocalModuleError>),

    #[error(
        "Pulumi stack FQDN is required. Provide it via --stack flag or set {} label in manifest",
        planton_core::labels::PULUMI_STACK_FQDN_LABEL
    )]
    MissingStackFqdn,

    #[error("{kind} module not found at {path}")]
    ModuleNotFound { kind: String, path: PathBuf },

    #[error("{0} is not installed or not on PATH")]
    BinaryNotFound(String),

    #[error("{binary} {operation} failed (exit code: {code})")]
    CommandFailed {
        binary: String,
        operation: String,
        code: String,
    },

    #[error("invalid {provider} provider config {path}: {reason}")]
    ProviderConfig {
        provider: String,
        path: PathBuf,
        reason: String,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IacError>;
