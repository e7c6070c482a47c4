//! Project Planton manifest handling
//!
//! - [`Manifest`]: untyped Kubernetes-style resource document
//! - [`CloudResourceKind`]: registry of supported kinds and their module paths
//! - [`overrides`]: `--set key=value` field overrides
//! - [`validate`]: envelope validation
//! - [`labels`]: provisioner, kube context and state backend labels
//! - [`StackInput`]: manifest plus provider credentials handed to a module
//! - [`tfvars`]: manifest rendering for Terraform/OpenTofu

pub mod error;
pub mod kind;
pub mod labels;
pub mod manifest;
pub mod overrides;
pub mod stack_input;
pub mod tfvars;
pub mod validate;

pub use error::{ManifestError, Result};
pub use kind::{CloudResourceKind, Provider};
pub use labels::{
    BackendType, ProvisionerType, PulumiStackFqdn, TofuBackendConfig, kube_context,
    provisioner_from_manifest, pulumi_stack_from_manifest, tofu_backend_from_manifest,
};
pub use manifest::Manifest;
pub use overrides::{
    OverriddenManifest, Overrides, apply_overrides, apply_overrides_to_file, parse_overrides,
};
pub use stack_input::{StackInput, extract_target};
pub use tfvars::render_tfvars;
pub use validate::validate;
