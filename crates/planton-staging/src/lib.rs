//! Staging area for IaC modules
//!
//! The modules repository is cloned once into `<workspace>/staging/<repo>`
//! and kept at a recorded version (`<workspace>/staging/.version`).
//! Every run copies the mirror into a scratch workspace instead of
//! cloning again, so only the first execution needs the network.

pub mod error;
pub mod git;

pub use error::{Result, StagingError};
pub use git::Git;

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Upstream repository holding the Pulumi and Terraform modules
pub const DEFAULT_CLONE_URL: &str = "https://github.com/plantonhq/project-planton.git";

/// Overrides the clone URL (forks, mirrors, tests)
pub const MODULES_REPO_ENV: &str = "PROJECT_PLANTON_MODULES_REPO";

const VERSION_FILE_NAME: &str = ".version";
const MAIN_BRANCH: &str = "main";
const LATEST: &str = "latest";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingInfo {
    pub exists: bool,
    pub version: String,
    pub repo_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
    clone_url: String,
    repo_name: String,
    git: Git,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>, clone_url: impl Into<String>) -> Result<Self> {
        let clone_url = clone_url.into();
        let repo_name = repo_name_from_url(&clone_url)?;
        Ok(Self {
            root: root.into(),
            clone_url,
            repo_name,
            git: Git::default(),
        })
    }

    /// Staging area under the CLI workspace, honoring `PROJECT_PLANTON_MODULES_REPO`
    pub fn from_workspace() -> Result<Self> {
        let clone_url = match std::env::var(MODULES_REPO_ENV) {
            Ok(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => DEFAULT_CLONE_URL.to_string(),
        };
        Self::new(planton_config::staging_dir()?, clone_url)
    }

    pub fn with_git(mut self, git: Git) -> Self {
        self.git = git;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn clone_url(&self) -> &str {
        &self.clone_url
    }

    pub fn repo_name(&self) -> &str {
        &self.repo_name
    }

    pub fn repo_path(&self) -> PathBuf {
        self.root.join(&self.repo_name)
    }

    pub fn version_file(&self) -> PathBuf {
        self.root.join(VERSION_FILE_NAME)
    }

    /// Recorded version, empty when nothing has been checked out yet
    pub fn current_version(&self) -> Result<String> {
        match std::fs::read_to_string(self.version_file()) {
            Ok(content) => Ok(content.trim().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_version(&self, version: &str) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(self.version_file(), format!("{version}\n"))?;
        Ok(())
    }

    pub fn exists(&self) -> bool {
        self.repo_path().join(".git").is_dir()
    }

    async fn clone_if_missing(&self) -> Result<bool> {
        if self.exists() {
            return Ok(false);
        }

        std::fs::create_dir_all(&self.root)?;
        let repo_path = self.repo_path();
        tracing::info!(
            url = %self.clone_url,
            path = %repo_path.display(),
            "Cloning modules repository into staging"
        );
        self.git.clone_repo(&self.clone_url, &repo_path).await?;

        // a sidecar left from a removed clone no longer describes the checkout
        match std::fs::remove_file(self.version_file()) {
            Ok(()) => tracing::debug!("Dropped stale staging version record"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(true)
    }

    /// Clone when missing and move to `target` unless it is already recorded
    pub async fn ensure(&self, target: Option<&str>) -> Result<()> {
        let cloned = self.clone_if_missing().await?;

        let Some(target) = target.filter(|t| !t.is_empty()) else {
            return Ok(());
        };

        if !cloned && self.current_version()? == target {
            tracing::debug!(version = target, "Staging already at requested version");
            return Ok(());
        }

        let repo_path = self.repo_path();
        self.git.fetch_all(&repo_path).await?;
        self.git.checkout(&repo_path, target).await?;
        self.write_version(target)
    }

    /// Fetch and fast-forward `main`, then return to the previously recorded version.
    ///
    /// Returns the version the staging area ends up on.
    pub async fn pull(&self) -> Result<String> {
        if self.clone_if_missing().await? {
            self.write_version(MAIN_BRANCH)?;
            return Ok(MAIN_BRANCH.to_string());
        }

        let repo_path = self.repo_path();
        let previous = self.current_version().unwrap_or_default();

        self.git.fetch_all(&repo_path).await?;
        self.git.checkout(&repo_path, MAIN_BRANCH).await?;
        self.git.pull(&repo_path).await?;

        if previous.is_empty() || previous == MAIN_BRANCH {
            self.write_version(MAIN_BRANCH)?;
            return Ok(MAIN_BRANCH.to_string());
        }

        match self.git.checkout(&repo_path, &previous).await {
            Ok(()) => {
                self.write_version(&previous)?;
                Ok(previous)
            }
            Err(e) => {
                tracing::warn!(
                    version = %previous,
                    error = %e,
                    "Could not restore previous version, staying on main"
                );
                self.write_version(MAIN_BRANCH)?;
                Ok(MAIN_BRANCH.to_string())
            }
        }
    }

    /// Check out a tag, branch or commit; `latest` resolves to the highest tag.
    ///
    /// Returns the resolved version.
    pub async fn checkout(&self, version: &str) -> Result<String> {
        self.clone_if_missing().await?;
        let repo_path = self.repo_path();

        let version = if version == LATEST {
            let tag = self.git.latest_tag(&repo_path).await?;
            tracing::info!(tag = %tag, "Resolved latest tag");
            tag
        } else {
            version.to_string()
        };

        self.git.fetch_all(&repo_path).await?;
        self.git.checkout(&repo_path, &version).await?;
        self.write_version(&version)?;
        Ok(version)
    }

    pub fn info(&self) -> Result<StagingInfo> {
        let exists = self.exists();
        Ok(StagingInfo {
            exists,
            version: if exists {
                self.current_version()?
            } else {
                String::new()
            },
            repo_path: self.repo_path(),
        })
    }

    /// Tag or short SHA the mirror is actually sitting on
    pub async fn head(&self) -> Result<String> {
        self.git.current_head(&self.repo_path()).await
    }

    /// Replace `<dest_dir>/<repo>` with a full copy of the mirror
    pub async fn copy_to_workspace(&self, dest_dir: &Path) -> Result<PathBuf> {
        let source = self.repo_path();
        let dest = dest_dir.join(&self.repo_name);

        if dest.exists() {
            tokio::fs::remove_dir_all(&dest).await?;
        }
        tokio::fs::create_dir_all(dest_dir).await?;

        tracing::debug!(from = %source.display(), to = %dest.display(), "Copying staging repository");

        let (from, to) = (source.clone(), dest.clone());
        tokio::task::spawn_blocking(move || copy_tree(&from, &to))
            .await
            .map_err(|e| StagingError::Io(std::io::Error::other(e)))?
            .map_err(|e| StagingError::CopyFailed {
                from: source,
                to: dest.clone(),
                reason: e.to_string(),
            })?;

        Ok(dest)
    }

    /// Check out `version` inside a workspace copy; the mirror is left alone
    pub async fn checkout_in_workspace(&self, workspace_repo: &Path, version: &str) -> Result<()> {
        if version.is_empty() {
            return Ok(());
        }
        self.git.fetch_all(workspace_repo).await?;
        self.git.checkout(workspace_repo, version).await
    }

    pub fn cleanup_workspace_copy(&self, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Ok(());
        }
        if path == self.repo_path() {
            return Err(StagingError::RefusingToDelete(path.to_path_buf()));
        }
        match std::fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Recursive copy that keeps symlinks as links and file modes as they are
fn copy_tree(source: &Path, dest: &Path) -> std::io::Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = dest.join(relative);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else if file_type.is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(std::fs::read_link(link)?, target)
}

#[cfg(windows)]
fn copy_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    let points_to = std::fs::read_link(link)?;
    if link.is_dir() {
        std::os::windows::fs::symlink_dir(points_to, target)
    } else {
        std::os::windows::fs::symlink_file(points_to, target)
    }
}

/// Last URL path segment without `.git`
pub fn repo_name_from_url(url: &str) -> Result<String> {
    let name = url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default()
        .trim_end_matches(".git");

    if name.is_empty() {
        return Err(StagingError::InvalidCloneUrl(url.to_string()));
    }
    Ok(name.to_string())
}
