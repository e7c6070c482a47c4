//! Homebrew-managed installs

use super::UpgradeError;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::process::Command;

const CASK: &str = "project-planton";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMethod {
    Homebrew,
    Direct,
}

impl fmt::Display for InstallMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallMethod::Homebrew => f.write_str("Homebrew"),
            InstallMethod::Direct => f.write_str("direct download"),
        }
    }
}

/// How the running binary was installed
pub fn detect() -> InstallMethod {
    match current_executable() {
        Some(path) if is_homebrew_path(&path) => InstallMethod::Homebrew,
        _ => InstallMethod::Direct,
    }
}

fn current_executable() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    Some(std::fs::canonicalize(&exe).unwrap_or(exe))
}

pub fn is_homebrew_path(path: &Path) -> bool {
    let path = path.to_string_lossy();
    ["/Cellar/", "/Caskroom/", "/homebrew/"]
        .iter()
        .any(|marker| path.contains(marker))
}

/// `brew update` followed by `brew upgrade --cask project-planton`
pub async fn upgrade() -> Result<(), UpgradeError> {
    brew(&["update"]).await?;
    brew(&["upgrade", "--cask", CASK]).await
}

pub async fn uninstall() -> Result<(), UpgradeError> {
    brew(&["uninstall", "--cask", CASK]).await
}

async fn brew(args: &[&str]) -> Result<(), UpgradeError> {
    let command = format!("brew {}", args.join(" "));
    tracing::debug!("Running: {}", command);

    let status = Command::new("brew")
        .args(args)
        .status()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => UpgradeError::CommandFailed {
                command: command.clone(),
                stderr: "brew not found in PATH".to_string(),
            },
            _ => UpgradeError::Io(e),
        })?;

    if !status.success() {
        return Err(UpgradeError::CommandFailed {
            command,
            stderr: format!("exit status {}", status.code().unwrap_or(-1)),
        });
    }
    Ok(())
}
