//! Workspace layout and persisted settings for the Project Planton CLI.
//!
//! Everything the CLI keeps on disk lives under one workspace directory,
//! `~/.project-planton` by default:
//!
//! ```text
//! ~/.project-planton/
//! ├── config.yaml        # `project-planton config set ...`
//! ├── downloads/         # manifests fetched from URLs
//! ├── staging/           # git mirror of the modules repository
//! ├── pulumi/<fqdn>/     # per-stack workspace copies
//! └── tofu/              # workspace copy for tofu/terraform runs
//! ```

pub mod cli_config;
pub mod error;

pub use cli_config::{CliConfig, ConfigKey};
pub use error::*;

use std::path::PathBuf;

/// Overrides the workspace root (used by tests and CI sandboxes)
pub const HOME_ENV: &str = "PROJECT_PLANTON_HOME";

const WORKSPACE_DIR_NAME: &str = ".project-planton";

/// Workspace root, created on first use
pub fn workspace_dir() -> Result<PathBuf> {
    let dir = match std::env::var(HOME_ENV) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => dirs::home_dir()
            .ok_or(ConfigError::HomeDirNotFound)?
            .join(WORKSPACE_DIR_NAME),
    };

    ensure_dir(dir)
}

/// Directory for manifests downloaded from URLs
pub fn manifest_download_dir() -> Result<PathBuf> {
    ensure_dir(workspace_dir()?.join("downloads"))
}

/// Parent directory of the staging clone
pub fn staging_dir() -> Result<PathBuf> {
    Ok(workspace_dir()?.join("staging"))
}

/// Parent directory for per-stack pulumi module copies
pub fn pulumi_workspace_dir() -> Result<PathBuf> {
    ensure_dir(workspace_dir()?.join("pulumi"))
}

/// Parent directory for tofu/terraform module copies
pub fn tofu_workspace_dir() -> Result<PathBuf> {
    ensure_dir(workspace_dir()?.join("tofu"))
}

/// Path of the persisted CLI settings
pub fn config_file_path() -> Result<PathBuf> {
    Ok(workspace_dir()?.join("config.yaml"))
}

fn ensure_dir(dir: PathBuf) -> Result<PathBuf> {
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        tracing::debug!("created directory {}", dir.display());
    }
    Ok(dir)
}
