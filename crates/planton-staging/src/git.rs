//! git CLI wrapper

use crate::error::{Result, StagingError};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct Git {
    program: String,
}

impl Default for Git {
    fn default() -> Self {
        Self::new("git")
    }
}

impl Git {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run a git command and return stdout
    pub async fn run(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: {} {}", self.program, args.join(" "));

        let output = cmd.output().await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StagingError::GitNotFound,
            _ => StagingError::Io(e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StagingError::CommandFailed {
                command: args.join(" "),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run a git command inside `repo` (`git -C <repo> ...`)
    pub async fn run_in(&self, repo: &Path, args: &[&str]) -> Result<String> {
        let repo = repo.to_string_lossy();
        let mut full = vec!["-C", repo.as_ref()];
        full.extend_from_slice(args);
        self.run(&full).await
    }

    pub async fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        self.run(&["clone", "--progress", url, &dest.to_string_lossy()])
            .await?;
        Ok(())
    }

    pub async fn fetch_all(&self, repo: &Path) -> Result<()> {
        self.run_in(repo, &["fetch", "--all", "--tags"]).await?;
        Ok(())
    }

    /// `git checkout <reference>`; unknown references become [`StagingError::VersionNotFound`]
    pub async fn checkout(&self, repo: &Path, reference: &str) -> Result<()> {
        match self.run_in(repo, &["checkout", reference]).await {
            Err(StagingError::CommandFailed { stderr, .. })
                if stderr.contains("did not match any") =>
            {
                Err(StagingError::VersionNotFound(reference.to_string()))
            }
            other => other.map(|_| ()),
        }
    }

    pub async fn pull(&self, repo: &Path) -> Result<()> {
        self.run_in(repo, &["pull"]).await?;
        Ok(())
    }

    /// Highest tag by version order
    pub async fn latest_tag(&self, repo: &Path) -> Result<String> {
        self.run_in(repo, &["fetch", "--tags"]).await?;
        let output = self.run_in(repo, &["tag", "--sort=-v:refname"]).await?;
        output
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or(StagingError::NoTags)
    }

    /// Tag at HEAD when exactly on one, otherwise the short commit SHA
    pub async fn current_head(&self, repo: &Path) -> Result<String> {
        if let Ok(tag) = self
            .run_in(repo, &["describe", "--tags", "--exact-match"])
            .await
        {
            return Ok(tag.trim().to_string());
        }
        let sha = self.run_in(repo, &["rev-parse", "--short", "HEAD"]).await?;
        Ok(sha.trim().to_string())
    }
}
