//! Pulumi CLI runner

use crate::error::{IacError, Result};
use crate::process::{exit_code, run_streaming};
use crate::provisioner::{Operation, Provisioner, RunRequest};
use async_trait::async_trait;
use planton_core::{Manifest, PulumiStackFqdn, pulumi_stack_from_manifest};
use std::path::Path;
use tokio::process::Command;

pub const STACK_INPUT_ENV: &str = "STACK_INPUT_YAML";
pub const KUBE_CONTEXT_ENV: &str = "KUBE_CTX";

const PULUMI_PROJECT_FILE: &str = "Pulumi.yaml";

#[derive(Debug, Clone)]
pub struct PulumiRunner {
    binary: String,
}

impl Default for PulumiRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl PulumiRunner {
    pub fn new() -> Self {
        Self::with_binary("pulumi")
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// CLI arguments for `operation` on `stack`
    pub fn args(operation: Operation, stack: &str, auto_approve: bool, diff: bool) -> Vec<String> {
        let mut args: Vec<String> = match operation {
            Operation::Init => vec!["stack".into(), "init".into()],
            Operation::Preview => vec!["preview".into()],
            Operation::Update => vec!["up".into()],
            Operation::Refresh => vec!["refresh".into()],
            Operation::Destroy => vec!["destroy".into()],
        };
        args.extend(["--stack".to_string(), stack.to_string()]);
        args.push("--non-interactive".into());

        if operation == Operation::Init {
            return args;
        }

        if auto_approve && operation != Operation::Preview {
            args.push("--yes".into());
            // `up` would otherwise stop at the preview prompt
            if operation == Operation::Update {
                args.push("--skip-preview".into());
            }
        }
        if diff {
            args.push("--diff".into());
        }
        args
    }
}

#[async_trait]
impl Provisioner for PulumiRunner {
    fn name(&self) -> &str {
        "pulumi"
    }

    fn binary(&self) -> &str {
        &self.binary
    }

    async fn run(&self, request: &RunRequest<'_>) -> Result<()> {
        let stack = resolve_stack_fqdn(request.manifest, request.stack_fqdn)?;
        let stack_fqdn = stack.to_string();

        set_project_name(request.module_dir, &stack.project)?;
        let stack_input = request.stack_input_yaml()?;

        let args = Self::args(
            request.operation,
            &stack_fqdn,
            request.auto_approve,
            request.diff,
        );

        let mut cmd = Command::new(&self.binary);
        cmd.args(&args);
        cmd.current_dir(request.module_dir);
        cmd.env(STACK_INPUT_ENV, stack_input);
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
        if output.status.success() {
            return Ok(());
        }

        if request.operation == Operation::Init && output.combined.contains("already exists") {
            tracing::info!(stack = %stack_fqdn, "Stack already exists");
            return Ok(());
        }

        // pulumi exits non-zero for some completed runs; only `error:` diagnostics count
        if !output.combined.contains("error:") {
            tracing::warn!(
                code = %exit_code(&output.status),
                "pulumi exited non-zero without error diagnostics, treating as success"
            );
            return Ok(());
        }

        Err(IacError::CommandFailed {
            binary: self.binary.clone(),
            operation: args.first().cloned().unwrap_or_default(),
            code: exit_code(&output.status),
        })
    }
}

/// Stack from the manifest labels, else the `--stack` flag
pub fn resolve_stack_fqdn(manifest: &Manifest, flag: Option<&str>) -> Result<PulumiStackFqdn> {
    if let Some(stack) = pulumi_stack_from_manifest(manifest)? {
        tracing::info!(stack = %stack, "Using Pulumi stack from manifest labels");
        return Ok(stack);
    }

    match flag.map(str::trim).filter(|f| !f.is_empty()) {
        Some(fqdn) => Ok(PulumiStackFqdn::parse(fqdn)?),
        None => Err(IacError::MissingStackFqdn),
    }
}

/// Point the top-level `name:` of `Pulumi.yaml` at `project`
pub fn set_project_name(module_dir: &Path, project: &str) -> Result<()> {
    let path = module_dir.join(PULUMI_PROJECT_FILE);
    let content = std::fs::read_to_string(&path)?;

    let mut replaced = false;
    let mut lines: Vec<String> = content
        .lines()
        .map(|line| {
            if !replaced && line.starts_with("name:") {
                replaced = true;
                format!("name: {project}")
            } else {
                line.to_string()
            }
        })
        .collect();
    if !replaced {
        lines.insert(0, format!("name: {project}"));
    }

    let mut updated = lines.join("\n");
    updated.push('\n');
    std::fs::write(&path, updated)?;
    Ok(())
}

pub fn is_pulumi_module(dir: &Path) -> bool {
    dir.join(PULUMI_PROJECT_FILE).is_file()
}
