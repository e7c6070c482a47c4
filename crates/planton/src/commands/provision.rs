//! `init`, `plan`, `apply`, `refresh` and `destroy`
//!
//! Every lifecycle command goes through the same pipeline and only the
//! operation differs. The manifest's provisioner label picks the engine.

use super::prepare_manifest;
use crate::manifest_source::ManifestArgs;
use crate::prompt;
use crate::upgrade::version;
use crate::utils::{print_error, print_handoff, print_info, print_run_result, print_step, print_success};
use clap::Args;
use planton_core::{BackendType, Provider, ProvisionerType};
use planton_iac::{
    BackendOverride, IacError, ModuleLocator, ModuleOptions, Operation, ProviderConfigOptions,
    RunRequest, provisioner_for, resolve_stack_fqdn,
};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ProvisionArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Directory containing the IaC module (defaults to the current directory)
    #[arg(long)]
    pub module_dir: Option<PathBuf>,

    /// Use the module from a local checkout of the project-planton repository
    #[arg(long)]
    pub local_module: bool,

    /// Path of the local project-planton checkout used by --local-module
    #[arg(long, value_name = "DIR")]
    pub project_planton_git_repo: Option<PathBuf>,

    /// Tag, branch or commit of the modules to check out in the workspace copy
    #[arg(long)]
    pub module_version: Option<String>,

    /// Keep the workspace copy of the modules after the run
    #[arg(long)]
    pub no_cleanup: bool,

    /// Pulumi stack FQDN (<org>/<project>/<stack>)
    #[arg(long)]
    pub stack: Option<String>,

    /// Kubernetes context, overrides the manifest label
    #[arg(long)]
    pub kube_context: Option<String>,

    /// Skip interactive approval (Tofu/Terraform)
    #[arg(long, visible_alias = "yes")]
    pub auto_approve: bool,

    /// Show detailed resource diffs (Pulumi)
    #[arg(long)]
    pub diff: bool,

    /// Plan a destroy instead of an update (Tofu/Terraform)
    #[arg(long)]
    pub destroy: bool,

    /// State backend type: local, s3, gcs or azurerm (Tofu/Terraform)
    #[arg(long)]
    pub backend_type: Option<String>,

    /// Backend configuration key=value pair or file (repeatable, Tofu/Terraform)
    #[arg(long, value_name = "CONFIG")]
    pub backend_config: Vec<String>,

    /// Path of the MongoDB Atlas provider config file
    #[arg(long)]
    pub atlas_provider_config: Option<PathBuf>,

    /// Path of the Auth0 provider config file
    #[arg(long)]
    pub auth0_provider_config: Option<PathBuf>,

    /// Path of the AWS provider config file
    #[arg(long)]
    pub aws_provider_config: Option<PathBuf>,

    /// Path of the Azure provider config file
    #[arg(long)]
    pub azure_provider_config: Option<PathBuf>,

    /// Path of the Cloudflare provider config file
    #[arg(long)]
    pub cloudflare_provider_config: Option<PathBuf>,

    /// Path of the Confluent provider config file
    #[arg(long)]
    pub confluent_provider_config: Option<PathBuf>,

    /// Path of the GCP provider config file
    #[arg(long)]
    pub gcp_provider_config: Option<PathBuf>,

    /// Path of the kubeconfig-style Kubernetes provider config file
    #[arg(long)]
    pub kubernetes_provider_config: Option<PathBuf>,

    /// Path of the Snowflake provider config file
    #[arg(long)]
    pub snowflake_provider_config: Option<PathBuf>,
}

impl ProvisionArgs {
    /// Provider configs: flags, then `--input-dir` files, then environment
    /// for whatever is still missing
    pub async fn provider_configs(&self) -> anyhow::Result<ProviderConfigOptions> {
        let flags = ProviderConfigOptions::from_flags([
            (Provider::Atlas, self.atlas_provider_config.clone()),
            (Provider::Auth0, self.auth0_provider_config.clone()),
            (Provider::Aws, self.aws_provider_config.clone()),
            (Provider::Azure, self.azure_provider_config.clone()),
            (Provider::Cloudflare, self.cloudflare_provider_config.clone()),
            (Provider::Confluent, self.confluent_provider_config.clone()),
            (Provider::Gcp, self.gcp_provider_config.clone()),
            (Provider::Kubernetes, self.kubernetes_provider_config.clone()),
            (Provider::Snowflake, self.snowflake_provider_config.clone()),
        ]);

        let input_dir = self
            .manifest
            .input_dir
            .as_deref()
            .map(ProviderConfigOptions::from_input_dir)
            .unwrap_or_default();

        Ok(flags.merge(input_dir).with_env_fallback().await?)
    }

    pub fn backend_override(&self) -> anyhow::Result<BackendOverride> {
        let backend_type = self
            .backend_type
            .as_deref()
            .map(str::parse::<BackendType>)
            .transpose()?;
        Ok(BackendOverride {
            backend_type,
            configs: self.backend_config.clone(),
        })
    }

    pub fn module_options(&self) -> ModuleOptions {
        ModuleOptions {
            module_dir: self
                .module_dir
                .clone()
                .or_else(|| std::env::current_dir().ok()),
            local_module: self.local_module,
            local_repo: self.project_planton_git_repo.clone(),
            module_version: self.module_version.clone(),
            no_cleanup: self.no_cleanup,
            cli_version: version::release_version(),
        }
    }
}

pub async fn handle(operation: Operation, args: ProvisionArgs) -> anyhow::Result<()> {
    let prepared = prepare_manifest(&args.manifest).await?;
    let manifest = &prepared.manifest;

    print_step("Detecting provisioner...");
    let provisioner = match planton_core::provisioner_from_manifest(manifest)? {
        Some(provisioner) => provisioner,
        None => {
            print_info("Provisioner not specified in manifest");
            prompt::select_provisioner()?
        }
    };
    print_success(&format!("Using provisioner: {provisioner}"));

    print_step("Preparing execution...");
    let provider_configs = args.provider_configs().await?;
    for (provider, path) in provider_configs.entries() {
        tracing::debug!(provider, path = %path.display(), "Using provider config");
    }
    let backend = args.backend_override()?;
    let kind = manifest.cloud_resource_kind()?;
    let stack = match provisioner {
        ProvisionerType::Pulumi => Some(resolve_stack_fqdn(manifest, args.stack.as_deref())?),
        ProvisionerType::Tofu | ProvisionerType::Terraform => None,
    };
    let stack_fqdn = stack.as_ref().map(ToString::to_string);
    let kube_context = planton_core::kube_context(manifest, args.kube_context.as_deref());

    let locator = ModuleLocator::from_workspace(args.module_options())?;
    let module = match locator.locate(kind, provisioner, stack.as_ref()).await {
        Ok(module) => module,
        Err(IacError::LocalModule(e)) => {
            print_error(&e.to_string());
            eprint!("{}", e.details());
            anyhow::bail!("failed to resolve local module for {kind}");
        }
        Err(e) => return Err(e.into()),
    };
    print_success("Execution prepared");
    tracing::info!(path = %module.path().display(), "Module directory");

    // pulumi runs with --non-interactive, which needs --yes to change anything
    let auto_approve = provisioner == ProvisionerType::Pulumi || args.auto_approve;

    let request = RunRequest {
        manifest,
        module_dir: module.path(),
        operation,
        auto_approve,
        diff: args.diff,
        destroy_plan: args.destroy,
        stack_fqdn: stack_fqdn.as_deref(),
        kube_context: kube_context.as_deref(),
        backend: &backend,
        provider_configs: &provider_configs,
    };

    let runner = provisioner_for(provisioner);
    print_handoff(runner.name());
    let result = runner.run(&request).await;
    print_run_result(runner.name(), result.is_ok());

    if args.no_cleanup
        && let Some(repo) = module.scratch_repo()
    {
        print_info(&format!("Workspace copy kept at {}", repo.display()));
    }

    result.map_err(Into::into)
}
