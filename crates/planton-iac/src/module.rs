//! Module directory resolution
//!
//! A module comes from one of three places, tried in order:
//!
//! 1. `--module-dir`, when it already holds a module
//! 2. `--local-module`: a local checkout of the modules repository
//! 3. a scratch copy of the staging mirror under the CLI workspace

use crate::error::{IacError, Result};
use crate::pulumi::is_pulumi_module;
use crate::tofu::is_tofu_module;
use planton_core::{CloudResourceKind, ProvisionerType, PulumiStackFqdn};
use planton_staging::StagingArea;
use std::fmt;
use std::path::{Path, PathBuf};

/// Local checkout of the modules repository
pub const LOCAL_REPO_ENV: &str = "PROJECT_PLANTON_GIT_REPO";

const DEFAULT_LOCAL_REPO: &str = "scm/github.com/plantonhq/project-planton";
const REPO_URL: &str = "https://github.com/plantonhq/project-planton";

#[derive(Debug, Clone, Default)]
pub struct ModuleOptions {
    /// `--module-dir`
    pub module_dir: Option<PathBuf>,
    /// `--local-module`
    pub local_module: bool,
    /// `--project-planton-git-repo`
    pub local_repo: Option<PathBuf>,
    /// `--module-version`: checked out in the scratch copy only
    pub module_version: Option<String>,
    /// `--no-cleanup`
    pub no_cleanup: bool,
    /// Release the staging mirror follows; `None` for dev builds
    pub cli_version: Option<String>,
}

/// Resolved module directory
///
/// Scratch copies are deleted on drop unless cleanup was disabled.
#[derive(Debug)]
pub struct ModuleDir {
    path: PathBuf,
    scratch: Option<ScratchCopy>,
}

#[derive(Debug)]
struct ScratchCopy {
    repo_path: PathBuf,
    staging: StagingArea,
    cleanup: bool,
}

impl ModuleDir {
    fn existing(path: PathBuf) -> Self {
        Self {
            path,
            scratch: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Root of the scratch repository copy, if one was made
    pub fn scratch_repo(&self) -> Option<&Path> {
        self.scratch.as_ref().map(|s| s.repo_path.as_path())
    }

    /// Keep the scratch copy after drop
    pub fn keep(&mut self) {
        if let Some(scratch) = &mut self.scratch {
            scratch.cleanup = false;
        }
    }
}

impl Drop for ModuleDir {
    fn drop(&mut self) {
        let Some(scratch) = &self.scratch else {
            return;
        };
        if !scratch.cleanup {
            return;
        }
        if let Err(e) = scratch.staging.cleanup_workspace_copy(&scratch.repo_path) {
            tracing::warn!(
                path = %scratch.repo_path.display(),
                error = %e,
                "Failed to clean up workspace copy"
            );
        }
    }
}

/// Structured failure of `--local-module` resolution
#[derive(Debug)]
pub struct LocalModuleError {
    /// Step that failed
    pub stage: String,
    pub cause: String,
    pub context: String,
    /// Suggested fix, possibly multi-line
    pub hint: String,
}

impl fmt::Display for LocalModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "local module resolution failed at '{}': {}",
            self.stage, self.cause
        )
    }
}

impl std::error::Error for LocalModuleError {}

impl LocalModuleError {
    /// Context and hint lines for terminal output
    pub fn details(&self) -> String {
        let mut out = String::new();
        if !self.context.is_empty() {
            out.push_str(&format!("  Context: {}\n", self.context));
        }
        if !self.hint.is_empty() {
            out.push_str(&format!("\n  {}\n", self.hint));
        }
        out
    }
}

impl From<LocalModuleError> for IacError {
    fn from(e: LocalModuleError) -> Self {
        IacError::LocalModule(Box::new(e))
    }
}

/// Local repository: flag, then `PROJECT_PLANTON_GIT_REPO`, then `~/scm/github.com/plantonhq/project-planton`
pub fn local_repo_path(flag: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = flag.filter(|p| !p.as_os_str().is_empty()) {
        return Some(path.to_path_buf());
    }
    match std::env::var(LOCAL_REPO_ENV) {
        Ok(path) if !path.trim().is_empty() => return Some(PathBuf::from(path.trim())),
        _ => {}
    }
    dirs::home_dir().map(|home| home.join(DEFAULT_LOCAL_REPO))
}

#[derive(Debug, Clone)]
pub struct ModuleLocator {
    options: ModuleOptions,
    staging: StagingArea,
    pulumi_dir: PathBuf,
    tofu_dir: PathBuf,
}

impl ModuleLocator {
    /// `pulumi_dir` and `tofu_dir` receive the scratch copies of the staging repo
    pub fn new(
        options: ModuleOptions,
        staging: StagingArea,
        pulumi_dir: PathBuf,
        tofu_dir: PathBuf,
    ) -> Self {
        Self {
            options,
            staging,
            pulumi_dir,
            tofu_dir,
        }
    }

    /// Locator backed by the CLI workspace and its staging area
    pub fn from_workspace(options: ModuleOptions) -> Result<Self> {
        Ok(Self::new(
            options,
            StagingArea::from_workspace()?,
            planton_config::pulumi_workspace_dir()?,
            planton_config::tofu_workspace_dir()?,
        ))
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Module directory for `kind` and `provisioner`
    ///
    /// `stack` picks the per-stack scratch directory for Pulumi.
    pub async fn locate(
        &self,
        kind: CloudResourceKind,
        provisioner: ProvisionerType,
        stack: Option<&PulumiStackFqdn>,
    ) -> Result<ModuleDir> {
        if let Some(dir) = &self.options.module_dir {
            if is_module(dir, provisioner) {
                tracing::debug!(path = %dir.display(), "Using module directory from --module-dir");
                return Ok(ModuleDir::existing(dir.clone()));
            }
            tracing::debug!(
                path = %dir.display(),
                "--module-dir is not a {provisioner} module, falling back"
            );
        }

        if self.options.local_module {
            return self.locate_local(kind, provisioner).map(ModuleDir::existing);
        }

        self.locate_staged(kind, provisioner, stack).await
    }

    fn locate_local(&self, kind: CloudResourceKind, provisioner: ProvisionerType) -> Result<PathBuf> {
        let repo = local_repo_path(self.options.local_repo.as_deref()).ok_or_else(|| {
            LocalModuleError {
                stage: "locating local repository".to_string(),
                cause: "home directory not found".to_string(),
                context: String::new(),
                hint: format!(
                    "Pass --project-planton-git-repo or set {LOCAL_REPO_ENV} to your checkout."
                ),
            }
        })?;

        if !repo.is_dir() {
            let repo_display = repo.display();
            return Err(LocalModuleError {
                stage: "locating local repository".to_string(),
                cause: "directory does not exist".to_string(),
                context: format!("repo path: {repo_display}"),
                hint: format!(
                    "The project-planton repository was not found at '{repo_display}'.\n  \
                     Options:\n  \
                     1. Clone the repo: git clone {REPO_URL} {repo_display}\n  \
                     2. Set a different path: --project-planton-git-repo /your/path\n  \
                     3. Use environment variable: export {LOCAL_REPO_ENV}=/your/path"
                ),
            }
            .into());
        }

        let module_path = repo.join(kind.module_subdir(provisioner));
        if !module_path.is_dir() {
            let module_display = module_path.display();
            return Err(LocalModuleError {
                stage: "resolving module path".to_string(),
                cause: format!("{} not found", module_display),
                context: format!("kind: {kind}, provisioner: {provisioner}"),
                hint: format!(
                    "The {provisioner} module for '{kind}' was not found.\n  \
                     Expected location: {module_display}\n  \
                     Possible fixes:\n  \
                     1. Verify the kind '{kind}' is correct in your manifest\n  \
                     2. Check if the module exists: ls -la {module_display}\n  \
                     3. Pull latest changes: cd {} && git pull",
                    repo.display()
                ),
            }
            .into());
        }

        tracing::info!(path = %module_path.display(), "Using local module");
        Ok(module_path)
    }

    async fn locate_staged(
        &self,
        kind: CloudResourceKind,
        provisioner: ProvisionerType,
        stack: Option<&PulumiStackFqdn>,
    ) -> Result<ModuleDir> {
        let scratch_dir = match (provisioner, stack) {
            (ProvisionerType::Pulumi, Some(stack)) => self
                .pulumi_dir
                .join(&stack.organization)
                .join(&stack.project)
                .join(&stack.stack),
            (ProvisionerType::Pulumi, None) => self.pulumi_dir.clone(),
            _ => self.tofu_dir.clone(),
        };

        self.staging
            .ensure(self.options.cli_version.as_deref())
            .await?;

        let repo_path = self.staging.copy_to_workspace(&scratch_dir).await?;
        let mut module_dir = ModuleDir {
            path: repo_path.join(kind.module_subdir(provisioner)),
            scratch: Some(ScratchCopy {
                repo_path: repo_path.clone(),
                staging: self.staging.clone(),
                cleanup: true,
            }),
        };

        // errors below drop `module_dir`, which removes the copy
        if let Some(version) = self.options.module_version.as_deref() {
            self.staging
                .checkout_in_workspace(&repo_path, version)
                .await?;
        }

        if !module_dir.path.is_dir() {
            return Err(IacError::ModuleNotFound {
                kind: kind.to_string(),
                path: module_dir.path.clone(),
            });
        }

        if self.options.no_cleanup {
            module_dir.keep();
        }
        Ok(module_dir)
    }
}

fn is_module(dir: &Path, provisioner: ProvisionerType) -> bool {
    match provisioner {
        ProvisionerType::Pulumi => is_pulumi_module(dir),
        ProvisionerType::Tofu | ProvisionerType::Terraform => is_tofu_module(dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::process::{Command, Stdio};
    use tempfile::TempDir;

    fn kind() -> CloudResourceKind {
        CloudResourceKind::from_name("KubernetesRedis").unwrap()
    }

    fn locator(temp: &TempDir, options: ModuleOptions) -> ModuleLocator {
        let staging = StagingArea::new(
            temp.path().join("staging"),
            "https://github.com/plantonhq/project-planton.git",
        )
        .unwrap();
        ModuleLocator::new(
            options,
            staging,
            temp.path().join("workspace/pulumi"),
            temp.path().join("workspace/tofu"),
        )
    }

    #[tokio::test]
    async fn test_explicit_module_dir() {
        let temp = TempDir::new().unwrap();
        let module = temp.path().join("module");
        std::fs::create_dir_all(&module).unwrap();
        std::fs::write(module.join("Pulumi.yaml"), "name: x\n").unwrap();

        let locator = locator(
            &temp,
            ModuleOptions {
                module_dir: Some(module.clone()),
                ..Default::default()
            },
        );
        let dir = locator
            .locate(kind(), ProvisionerType::Pulumi, None)
            .await
            .unwrap();
        assert_eq!(dir.path(), module);
        assert!(dir.scratch_repo().is_none());
    }

    #[tokio::test]
    async fn test_local_module() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("repo");
        let module = repo.join(kind().module_subdir(ProvisionerType::Tofu));
        std::fs::create_dir_all(&module).unwrap();

        let locator = locator(
            &temp,
            ModuleOptions {
                local_module: true,
                local_repo: Some(repo),
                ..Default::default()
            },
        );
        let dir = locator
            .locate(kind(), ProvisionerType::Terraform, None)
            .await
            .unwrap();
        assert_eq!(dir.path(), module);
    }

    #[tokio::test]
    async fn test_local_module_missing_repo_has_hint() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("nope");

        let locator = locator(
            &temp,
            ModuleOptions {
                local_module: true,
                local_repo: Some(repo.clone()),
                ..Default::default()
            },
        );
        let err = locator
            .locate(kind(), ProvisionerType::Pulumi, None)
            .await
            .unwrap_err();

        let IacError::LocalModule(err) = err else {
            panic!("expected local module error");
        };
        assert_eq!(err.stage, "locating local repository");
        assert!(err.hint.contains("git clone https://github.com/plantonhq/project-planton"));
        assert!(err.hint.contains("PROJECT_PLANTON_GIT_REPO"));
        assert!(err.details().contains(&repo.display().to_string()));
    }

    #[tokio::test]
    async fn test_local_module_missing_kind_dir() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();

        let locator = locator(
            &temp,
            ModuleOptions {
                local_module: true,
                local_repo: Some(repo),
                ..Default::default()
            },
        );
        let err = locator
            .locate(kind(), ProvisionerType::Pulumi, None)
            .await
            .unwrap_err();
        let IacError::LocalModule(err) = err else {
            panic!("expected local module error");
        };
        assert_eq!(err.stage, "resolving module path");
        assert!(err.hint.contains("kubernetesredis/v1/iac/pulumi"));
    }

    #[test]
    #[serial]
    fn test_local_repo_path_precedence() {
        temp_env::with_var(LOCAL_REPO_ENV, Some("/from/env"), || {
            assert_eq!(
                local_repo_path(Some(Path::new("/from/flag"))),
                Some(PathBuf::from("/from/flag"))
            );
            assert_eq!(local_repo_path(None), Some(PathBuf::from("/from/env")));
        });
        temp_env::with_var_unset(LOCAL_REPO_ENV, || {
            let path = local_repo_path(None).unwrap();
            assert!(path.ends_with("scm/github.com/plantonhq/project-planton"));
        });
    }

    fn git(dir: &Path, args: &[&str]) -> bool {
        Command::new("git")
            .args(["-c", "user.email=test@example.com", "-c", "user.name=test"])
            .arg("-C")
            .arg(dir)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success())
    }

    #[tokio::test]
    async fn test_staged_copy_is_removed_on_drop() {
        let temp = TempDir::new().unwrap();
        let upstream = temp.path().join("upstream").join("project-planton");
        let module = upstream.join(kind().module_subdir(ProvisionerType::Pulumi));
        std::fs::create_dir_all(&module).unwrap();
        std::fs::write(module.join("Pulumi.yaml"), "name: kubernetes-redis\n").unwrap();
        if !git(&upstream, &["init", "-q", "-b", "main"])
            || !git(&upstream, &["add", "."])
            || !git(&upstream, &["commit", "-q", "-m", "init"])
        {
            // git unavailable
            return;
        }

        let staging = StagingArea::new(
            temp.path().join("staging"),
            upstream.to_string_lossy().to_string(),
        )
        .unwrap();
        let locator = ModuleLocator::new(
            ModuleOptions::default(),
            staging,
            temp.path().join("workspace/pulumi"),
            temp.path().join("workspace/tofu"),
        );
        let stack = PulumiStackFqdn::parse("acme/redis/dev").unwrap();

        let dir = locator
            .locate(kind(), ProvisionerType::Pulumi, Some(&stack))
            .await
            .unwrap();
        let scratch = dir.scratch_repo().unwrap().to_path_buf();
        assert_eq!(
            scratch,
            temp.path()
                .join("workspace/pulumi/acme/redis/dev/project-planton")
        );
        assert!(dir.path().join("Pulumi.yaml").is_file());

        drop(dir);
        assert!(!scratch.exists());
        assert!(locator.staging().exists());
    }
}
