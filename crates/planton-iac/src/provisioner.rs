//! Provisioner trait definition

use crate::error::Result;
use crate::provider_config::ProviderConfigOptions;
use crate::pulumi::PulumiRunner;
use crate::tofu::{BackendOverride, TofuRunner};
use async_trait::async_trait;
use planton_core::{Manifest, ProvisionerType, StackInput};
use std::fmt;
use std::path::Path;

/// Lifecycle operation requested by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Init,
    Preview,
    Update,
    Refresh,
    Destroy,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Init => "init",
            Operation::Preview => "preview",
            Operation::Update => "update",
            Operation::Refresh => "refresh",
            Operation::Destroy => "destroy",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a provisioner needs for one run
#[derive(Debug)]
pub struct RunRequest<'a> {
    pub manifest: &'a Manifest,
    pub module_dir: &'a Path,
    pub operation: Operation,
    pub auto_approve: bool,
    /// Pulumi: show detailed diffs
    pub diff: bool,
    /// Tofu/Terraform: plan a destroy instead of an update
    pub destroy_plan: bool,
    /// Pulumi: `--stack` value, used when the manifest has no stack label
    pub stack_fqdn: Option<&'a str>,
    pub kube_context: Option<&'a str>,
    /// Tofu/Terraform: `--backend-type` / `--backend-config`
    pub backend: &'a BackendOverride,
    pub provider_configs: &'a ProviderConfigOptions,
}

impl RunRequest<'_> {
    /// Stack input YAML: the manifest plus the config of its provider, if any
    pub fn stack_input_yaml(&self) -> Result<String> {
        let kind = self.manifest.cloud_resource_kind()?;
        let mut input = StackInput::new(self.manifest.clone());
        if let Some(path) = self.provider_configs.config_for(kind.provider()) {
            input = input.with_provider_config_file(kind.provider(), path)?;
        }
        Ok(input.to_yaml_string()?)
    }
}

/// IaC engine abstraction
///
/// Pulumi and Tofu/Terraform implement this trait so commands can dispatch
/// on the manifest's provisioner without knowing the engine.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Returns the provisioner name (e.g., "pulumi", "tofu")
    fn name(&self) -> &str;

    /// Executable invoked for this provisioner
    fn binary(&self) -> &str;

    /// Run `request.operation` against the module in `request.module_dir`
    async fn run(&self, request: &RunRequest<'_>) -> Result<()>;
}

pub fn provisioner_for(provisioner: ProvisionerType) -> Box<dyn Provisioner> {
    match provisioner {
        ProvisionerType::Pulumi => Box::new(PulumiRunner::new()),
        ProvisionerType::Tofu => Box::new(TofuRunner::tofu()),
        ProvisionerType::Terraform => Box::new(TofuRunner::terraform()),
    }
}
