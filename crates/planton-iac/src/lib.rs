//! Provisioner runners for Project Planton
//!
//! Routes a validated manifest to Pulumi or OpenTofu/Terraform:
//!
//! - [`ModuleLocator`] finds the IaC module for the manifest's kind
//! - [`ProviderConfigOptions`] gathers provider credentials
//! - [`Provisioner`] implementations run the engine CLI against the module

pub mod error;
pub mod module;
pub mod process;
pub mod provider_config;
pub mod provisioner;
pub mod pulumi;
pub mod tofu;

pub use error::{IacError, Result};
pub use module::{LocalModuleError, ModuleDir, ModuleLocator, ModuleOptions};
pub use provider_config::{CONFIGURABLE_PROVIDERS, ProviderConfigOptions, ProviderEnv};
pub use provisioner::{Operation, Provisioner, RunRequest, provisioner_for};
pub use pulumi::{PulumiRunner, resolve_stack_fqdn};
pub use tofu::{BackendOverride, TofuRunner};
