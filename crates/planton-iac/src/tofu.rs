//! OpenTofu / Terraform CLI runner
//!
//! Both binaries accept the same commands, so one runner serves both.

use crate::error::{IacError, Result};
use crate::process::{exit_code, run_streaming};
use crate::provisioner::{Operation, Provisioner, RunRequest};
use crate::pulumi::KUBE_CONTEXT_ENV;
use async_trait::async_trait;
use planton_core::{
    BackendType, Manifest, ProvisionerType, render_tfvars, tofu_backend_from_manifest,
};
use std::path::Path;
use tokio::process::Command;

pub const TFVARS_FILE: &str = "terraform.tfvars";
pub const BACKEND_OVERRIDE_FILE: &str = "backend_override.tf";

/// `--backend-type` / `--backend-config` flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendOverride {
    pub backend_type: Option<BackendType>,
    /// `key=value` pairs or paths to backend config files
    pub configs: Vec<String>,
}

/// Backend selected for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBackend {
    pub backend_type: BackendType,
    pub config_args: Vec<String>,
}

/// Backend from manifest labels, adjusted by flags
///
/// An explicit `--backend-type` replaces the labelled type; `--backend-config`
/// values are passed after the labelled ones so they take effect last.
pub fn resolve_backend(manifest: &Manifest, flags: &BackendOverride) -> Result<ResolvedBackend> {
    let mut resolved = match tofu_backend_from_manifest(manifest)? {
        Some(config) => {
            tracing::info!(
                backend_type = %config.backend_type,
                backend_object = %config.backend_object,
                "Using state backend from manifest labels"
            );
            ResolvedBackend {
                backend_type: config.backend_type,
                config_args: config.backend_config_args(),
            }
        }
        None => {
            tracing::debug!("No state backend labels in manifest, using local backend");
            ResolvedBackend {
                backend_type: BackendType::Local,
                config_args: Vec::new(),
            }
        }
    };

    if let Some(backend_type) = flags.backend_type {
        resolved.backend_type = backend_type;
    }
    resolved.config_args.extend(flags.configs.iter().cloned());
    Ok(resolved)
}

#[derive(Debug, Clone)]
pub struct TofuRunner {
    provisioner: ProvisionerType,
    binary: String,
}

impl TofuRunner {
    pub fn tofu() -> Self {
        Self {
            provisioner: ProvisionerType::Tofu,
            binary: "tofu".to_string(),
        }
    }

    pub fn terraform() -> Self {
        Self {
            provisioner: ProvisionerType::Terraform,
            binary: "terraform".to_string(),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn init_args(backend_config_args: &[String]) -> Vec<String> {
        let mut args = vec!["init".to_string(), "-input=false".to_string()];
        args.extend(
            backend_config_args
                .iter()
                .map(|arg| format!("-backend-config={arg}")),
        );
        args
    }

    /// Arguments for the operation that follows `init`; `None` for init itself
    pub fn operation_args(
        operation: Operation,
        auto_approve: bool,
        destroy_plan: bool,
    ) -> Option<Vec<String>> {
        let mut args = match operation {
            Operation::Init => return None,
            Operation::Preview => vec!["plan".to_string()],
            Operation::Update => vec!["apply".to_string()],
            Operation::Refresh => vec!["refresh".to_string()],
            Operation::Destroy => vec!["destroy".to_string()],
        };

        match operation {
            // without approval the engine prompts on the terminal
            Operation::Update | Operation::Destroy => {
                if auto_approve {
                    args.push("-input=false".to_string());
                    args.push("-auto-approve".to_string());
                }
            }
            _ => {
                args.push("-input=false".to_string());
                if operation == Operation::Preview && destroy_plan {
                    args.push("-destroy".to_string());
                }
            }
        }
        Some(args)
    }

    async fn exec(
        &self,
        request: &RunRequest<'_>,
        args: &[String],
        env: &[(String, String)],
    ) -> Result<()> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        cmd.current_dir(request.module_dir);
        cmd.envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if let Some(context) = request.kube_context {
            cmd.env(KUBE_CONTEXT_ENV, context);
        }

        tracing::debug!(
            "Running: {} {} (in {})",
            self.binary,
            args.join(" "),
            request.module_dir.display()
        );

        let output = run_streaming(&self.binary, cmd).await?;
        if !output.status.success() {
            return Err(IacError::CommandFailed {
                binary: self.binary.clone(),
                operation: args.first().cloned().unwrap_or_default(),
                code: exit_code(&output.status),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Provisioner for TofuRunner {
    fn name(&self) -> &str {
        self.provisioner.as_str()
    }

    fn binary(&self) -> &str {
        &self.binary
    }

    async fn run(&self, request: &RunRequest<'_>) -> Result<()> {
        let backend = resolve_backend(request.manifest, request.backend)?;
        write_backend_override(request.module_dir, backend.backend_type)?;

        std::fs::write(
            request.module_dir.join(TFVARS_FILE),
            render_tfvars(request.manifest)?,
        )?;

        let provider_env = request.provider_configs.to_env_vars()?;

        self.exec(request, &Self::init_args(&backend.config_args), &provider_env.vars)
            .await?;

        if let Some(args) =
            Self::operation_args(request.operation, request.auto_approve, request.destroy_plan)
        {
            self.exec(request, &args, &provider_env.vars).await?;
        }
        Ok(())
    }
}

/// Declare the backend block for non-local state
///
/// `*_override.tf` files are merged over the module's own configuration.
pub fn write_backend_override(module_dir: &Path, backend_type: BackendType) -> Result<()> {
    let path = module_dir.join(BACKEND_OVERRIDE_FILE);
    if backend_type == BackendType::Local {
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        return Ok(());
    }

    std::fs::write(
        path,
        format!("terraform {{\n  backend \"{backend_type}\" {{}}\n}}\n"),
    )?;
    Ok(())
}

pub fn is_tofu_module(dir: &Path) -> bool {
    std::fs::read_dir(dir).is_ok_and(|entries| {
        entries.flatten().any(|entry| {
            entry.path().is_file() && entry.path().extension().is_some_and(|ext| ext == "tf")
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider_config::ProviderConfigOptions;

    fn manifest(labels: &str) -> Manifest {
        Manifest::from_yaml_str(&format!(
            "apiVersion: aws.project-planton.org/v1\nkind: AwsS3Bucket\nmetadata:\n  name: bucket\n  labels:\n{labels}spec:\n  versioningEnabled: true\n"
        ))
        .unwrap()
    }

    #[test]
    fn test_operation_args() {
        assert_eq!(TofuRunner::operation_args(Operation::Init, true, false), None);
        assert_eq!(
            TofuRunner::operation_args(Operation::Preview, true, true).unwrap(),
            ["plan", "-input=false", "-destroy"]
        );
        assert_eq!(
            TofuRunner::operation_args(Operation::Update, true, false).unwrap(),
            ["apply", "-input=false", "-auto-approve"]
        );
        assert_eq!(
            TofuRunner::operation_args(Operation::Destroy, false, false).unwrap(),
            ["destroy"]
        );
        assert_eq!(
            TofuRunner::operation_args(Operation::Refresh, true, false).unwrap(),
            ["refresh", "-input=false"]
        );
    }

    #[test]
    fn test_backend_from_labels_and_flags() {
        let manifest = manifest(
            "    terraform.project-planton.org/backend.type: s3\n    terraform.project-planton.org/backend.object: states/prod/bucket.tfstate\n",
        );
        let flags = BackendOverride {
            backend_type: None,
            configs: vec!["region=us-west-2".to_string()],
        };

        let backend = resolve_backend(&manifest, &flags).unwrap();
        assert_eq!(backend.backend_type, BackendType::S3);
        assert_eq!(
            backend.config_args,
            ["bucket=states", "key=prod/bucket.tfstate", "region=us-west-2"]
        );
        assert_eq!(
            TofuRunner::init_args(&backend.config_args),
            [
                "init",
                "-input=false",
                "-backend-config=bucket=states",
                "-backend-config=key=prod/bucket.tfstate",
                "-backend-config=region=us-west-2",
            ]
        );
    }

    #[test]
    fn test_backend_defaults_to_local() {
        let manifest = manifest("    env: dev\n");
        let backend = resolve_backend(&manifest, &BackendOverride::default()).unwrap();
        assert_eq!(backend.backend_type, BackendType::Local);
        assert!(backend.config_args.is_empty());

        let flags = BackendOverride {
            backend_type: Some(BackendType::Gcs),
            configs: vec!["bucket=b".to_string()],
        };
        let backend = resolve_backend(&manifest, &flags).unwrap();
        assert_eq!(backend.backend_type, BackendType::Gcs);
        assert_eq!(backend.config_args, ["bucket=b"]);
    }

    #[test]
    fn test_backend_override_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        write_backend_override(temp_dir.path(), BackendType::Azurerm).unwrap();
        assert_eq!(
            std::fs::read_to_string(temp_dir.path().join(BACKEND_OVERRIDE_FILE)).unwrap(),
            "terraform {\n  backend \"azurerm\" {}\n}\n"
        );

        write_backend_override(temp_dir.path(), BackendType::Local).unwrap();
        assert!(!temp_dir.path().join(BACKEND_OVERRIDE_FILE).exists());
    }

    #[test]
    fn test_is_tofu_module() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(!is_tofu_module(temp_dir.path()));
        std::fs::write(temp_dir.path().join("main.tf"), "").unwrap();
        assert!(is_tofu_module(temp_dir.path()));
        assert!(!is_tofu_module(&temp_dir.path().join("missing")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_writes_tfvars_and_calls_init_then_apply() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let module_dir = temp_dir.path().join("module");
        std::fs::create_dir_all(&module_dir).unwrap();
        std::fs::write(module_dir.join("main.tf"), "").unwrap();

        // fake binary that records its arguments
        let log = temp_dir.path().join("calls.log");
        let fake = temp_dir.path().join("fake-tofu");
        std::fs::write(
            &fake,
            format!("#!/bin/sh\necho \"$@\" >> {}\n", log.display()),
        )
        .unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let manifest = manifest("    env: dev\n");
        let backend = BackendOverride::default();
        let configs = ProviderConfigOptions::default();
        let request = RunRequest {
            manifest: &manifest,
            module_dir: &module_dir,
            operation: Operation::Update,
            auto_approve: true,
            diff: false,
            destroy_plan: false,
            stack_fqdn: None,
            kube_context: Some("kind-dev"),
            backend: &backend,
            provider_configs: &configs,
        };

        TofuRunner::tofu()
            .with_binary(fake.to_string_lossy().to_string())
            .run(&request)
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&log).unwrap(),
            "init -input=false\napply -input=false -auto-approve\n"
        );
        let tfvars = std::fs::read_to_string(module_dir.join(TFVARS_FILE)).unwrap();
        assert!(tfvars.contains("versioning_enabled = true"));
    }
}
