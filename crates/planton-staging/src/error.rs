use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StagingError {
    #[error("git is not installed or not on PATH")]
    GitNotFound,

    #[error("`git {command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("version '{0}' not found. Ensure the tag, branch, or commit SHA exists")]
    VersionNotFound(String),

    #[error("no tags found in repository")]
    NoTags,

    #[error("refusing to delete staging directory {0}")]
    RefusingToDelete(PathBuf),

    #[error("cannot derive a repository name from '{0}'")]
    InvalidCloneUrl(String),

    #[error("failed to copy {from} to {to}: {reason}")]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },

    #[error("Config error: {0}")]
    Config(#[from] planton_config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StagingError>;
