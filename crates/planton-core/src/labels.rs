//! Well-known manifest labels
//!
//! Labels under `metadata.labels` select the provisioner, the kube context
//! and the state backend for a manifest.

use crate::error::{ManifestError, Result};
use crate::manifest::Manifest;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const PROVISIONER_LABEL: &str = "project-planton.org/provisioner";
pub const KUBE_CONTEXT_LABEL: &str = "kubernetes.project-planton.org/context";

pub const PULUMI_STACK_FQDN_LABEL: &str = "pulumi.project-planton.org/stack.fqdn";
pub const PULUMI_ORGANIZATION_LABEL: &str = "pulumi.project-planton.org/organization";
pub const PULUMI_PROJECT_LABEL: &str = "pulumi.project-planton.org/project";
pub const PULUMI_STACK_NAME_LABEL: &str = "pulumi.project-planton.org/stack.name";

pub const TOFU_BACKEND_TYPE_LABEL: &str = "terraform.project-planton.org/backend.type";
pub const TOFU_BACKEND_OBJECT_LABEL: &str = "terraform.project-planton.org/backend.object";

/// IaC engine that runs a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisionerType {
    Pulumi,
    Tofu,
    Terraform,
}

impl ProvisionerType {
    pub const ALL: [ProvisionerType; 3] = [
        ProvisionerType::Pulumi,
        ProvisionerType::Tofu,
        ProvisionerType::Terraform,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionerType::Pulumi => "pulumi",
            ProvisionerType::Tofu => "tofu",
            ProvisionerType::Terraform => "terraform",
        }
    }
}

impl fmt::Display for ProvisionerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProvisionerType {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pulumi" => Ok(ProvisionerType::Pulumi),
            "tofu" => Ok(ProvisionerType::Tofu),
            "terraform" => Ok(ProvisionerType::Terraform),
            other => Err(ManifestError::InvalidLabel {
                label: PROVISIONER_LABEL.to_string(),
                reason: format!("'{other}' is not one of pulumi, tofu, terraform"),
            }),
        }
    }
}

/// Provisioner from the manifest label
///
/// `Ok(None)` when the label is absent or blank, so the caller can prompt.
pub fn provisioner_from_manifest(manifest: &Manifest) -> Result<Option<ProvisionerType>> {
    match manifest.label(PROVISIONER_LABEL) {
        Some(value) if !value.trim().is_empty() => value.parse().map(Some),
        _ => Ok(None),
    }
}

/// Kube context: the flag wins over the manifest label
pub fn kube_context(manifest: &Manifest, flag: Option<&str>) -> Option<String> {
    flag.filter(|f| !f.trim().is_empty())
        .map(str::to_string)
        .or_else(|| manifest.label(KUBE_CONTEXT_LABEL))
        .filter(|c| !c.trim().is_empty())
}

/// `<organization>/<project>/<stack>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulumiStackFqdn {
    pub organization: String,
    pub project: String,
    pub stack: String,
}

impl PulumiStackFqdn {
    pub fn parse(fqdn: &str) -> Result<Self> {
        let parts: Vec<&str> = fqdn.trim().split('/').collect();
        match parts.as_slice() {
            [org, project, stack]
                if !org.is_empty() && !project.is_empty() && !stack.is_empty() =>
            {
                Ok(Self {
                    organization: org.to_string(),
                    project: project.to_string(),
                    stack: stack.to_string(),
                })
            }
            _ => Err(ManifestError::InvalidLabel {
                label: PULUMI_STACK_FQDN_LABEL.to_string(),
                reason: format!(
                    "invalid stack.fqdn format '{fqdn}', expected <organization>/<project>/<stack>"
                ),
            }),
        }
    }
}

impl fmt::Display for PulumiStackFqdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.organization, self.project, self.stack)
    }
}

/// Pulumi stack from labels
///
/// `stack.fqdn` takes precedence over the organization/project/stack.name
/// triple. `Ok(None)` when no pulumi labels are present.
pub fn pulumi_stack_from_manifest(manifest: &Manifest) -> Result<Option<PulumiStackFqdn>> {
    let labels = manifest.labels();

    if let Some(fqdn) = non_empty(&labels, PULUMI_STACK_FQDN_LABEL) {
        return PulumiStackFqdn::parse(fqdn).map(Some);
    }

    let org = non_empty(&labels, PULUMI_ORGANIZATION_LABEL);
    let project = non_empty(&labels, PULUMI_PROJECT_LABEL);
    let stack = non_empty(&labels, PULUMI_STACK_NAME_LABEL);

    match (org, project, stack) {
        (None, None, None) => Ok(None),
        (Some(org), Some(project), Some(stack)) => Ok(Some(PulumiStackFqdn {
            organization: org.to_string(),
            project: project.to_string(),
            stack: stack.to_string(),
        })),
        _ => Err(ManifestError::InvalidLabel {
            label: PULUMI_STACK_NAME_LABEL.to_string(),
            reason: format!(
                "{PULUMI_ORGANIZATION_LABEL}, {PULUMI_PROJECT_LABEL} and {PULUMI_STACK_NAME_LABEL} must all be set"
            ),
        }),
    }
}

/// Terraform/OpenTofu state backend kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Local,
    S3,
    Gcs,
    Azurerm,
}

impl BackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendType::Local => "local",
            BackendType::S3 => "s3",
            BackendType::Gcs => "gcs",
            BackendType::Azurerm => "azurerm",
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendType {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "local" => Ok(BackendType::Local),
            "s3" => Ok(BackendType::S3),
            "gcs" => Ok(BackendType::Gcs),
            "azurerm" => Ok(BackendType::Azurerm),
            other => Err(ManifestError::InvalidLabel {
                label: TOFU_BACKEND_TYPE_LABEL.to_string(),
                reason: format!(
                    "unsupported backend type '{other}', supported: local, s3, gcs, azurerm"
                ),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TofuBackendConfig {
    pub backend_type: BackendType,
    /// `<bucket|container>/<key or prefix>`, or a state file path for `local`
    pub backend_object: String,
}

impl TofuBackendConfig {
    /// `-backend-config` values for `tofu init`
    pub fn backend_config_args(&self) -> Vec<String> {
        let (container_key, path_key) = match self.backend_type {
            BackendType::Local => return Vec::new(),
            BackendType::S3 => ("bucket", "key"),
            BackendType::Gcs => ("bucket", "prefix"),
            BackendType::Azurerm => ("container_name", "key"),
        };

        let mut parts = self.backend_object.splitn(2, '/');
        let mut args = Vec::new();
        if let Some(container) = parts.next() {
            args.push(format!("{container_key}={container}"));
        }
        if let Some(path) = parts.next() {
            args.push(format!("{path_key}={path}"));
        }
        args
    }
}

/// Tofu backend from labels
///
/// Both labels or neither; `Ok(None)` when neither is present.
pub fn tofu_backend_from_manifest(manifest: &Manifest) -> Result<Option<TofuBackendConfig>> {
    let labels = manifest.labels();

    let backend_type = labels.get(TOFU_BACKEND_TYPE_LABEL);
    let backend_object = labels.get(TOFU_BACKEND_OBJECT_LABEL);

    match (backend_type, backend_object) {
        (None, None) => Ok(None),
        (Some(backend_type), Some(backend_object)) => {
            if backend_type.trim().is_empty() {
                return Err(empty_label(TOFU_BACKEND_TYPE_LABEL));
            }
            if backend_object.trim().is_empty() {
                return Err(empty_label(TOFU_BACKEND_OBJECT_LABEL));
            }
            Ok(Some(TofuBackendConfig {
                backend_type: backend_type.parse()?,
                backend_object: backend_object.trim().to_string(),
            }))
        }
        _ => Err(ManifestError::InvalidLabel {
            label: TOFU_BACKEND_TYPE_LABEL.to_string(),
            reason: format!(
                "both {TOFU_BACKEND_TYPE_LABEL} and {TOFU_BACKEND_OBJECT_LABEL} must be set"
            ),
        }),
    }
}

fn non_empty<'a>(labels: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    labels
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn empty_label(label: &str) -> ManifestError {
    ManifestError::InvalidLabel {
        label: label.to_string(),
        reason: "cannot be empty".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_labels(labels: &[(&str, &str)]) -> Manifest {
        let mut yaml = String::from(
            "apiVersion: aws.project-planton.org/v1\nkind: AwsVpc\nmetadata:\n  name: vpc\n",
        );
        if !labels.is_empty() {
            yaml.push_str("  labels:\n");
            for (k, v) in labels {
                yaml.push_str(&format!("    {k}: \"{v}\"\n"));
            }
        }
        yaml.push_str("spec: {}\n");
        Manifest::from_yaml_str(&yaml).unwrap()
    }

    #[test]
    fn test_provisioner_label() {
        let m = with_labels(&[(PROVISIONER_LABEL, " Tofu ")]);
        assert_eq!(
            provisioner_from_manifest(&m).unwrap(),
            Some(ProvisionerType::Tofu)
        );

        let m = with_labels(&[(PROVISIONER_LABEL, "")]);
        assert_eq!(provisioner_from_manifest(&m).unwrap(), None);

        let m = with_labels(&[]);
        assert_eq!(provisioner_from_manifest(&m).unwrap(), None);

        let m = with_labels(&[(PROVISIONER_LABEL, "ansible")]);
        let err = provisioner_from_manifest(&m).unwrap_err();
        assert!(err.to_string().contains("pulumi, tofu, terraform"));
    }

    #[test]
    fn test_kube_context_flag_wins() {
        let m = with_labels(&[(KUBE_CONTEXT_LABEL, "from-label")]);
        assert_eq!(kube_context(&m, Some("from-flag")).as_deref(), Some("from-flag"));
        assert_eq!(kube_context(&m, Some("")).as_deref(), Some("from-label"));
        assert_eq!(kube_context(&m, None).as_deref(), Some("from-label"));
        assert_eq!(kube_context(&with_labels(&[]), None), None);
    }

    #[test]
    fn test_pulumi_fqdn_takes_precedence() {
        let m = with_labels(&[
            (PULUMI_STACK_FQDN_LABEL, "acme/network/dev"),
            (PULUMI_ORGANIZATION_LABEL, "other"),
        ]);
        let stack = pulumi_stack_from_manifest(&m).unwrap().unwrap();
        assert_eq!(stack.to_string(), "acme/network/dev");
        assert_eq!(stack.project, "network");
    }

    #[test]
    fn test_pulumi_individual_labels() {
        let m = with_labels(&[
            (PULUMI_ORGANIZATION_LABEL, "acme"),
            (PULUMI_PROJECT_LABEL, "network"),
            (PULUMI_STACK_NAME_LABEL, "prod"),
        ]);
        let stack = pulumi_stack_from_manifest(&m).unwrap().unwrap();
        assert_eq!(stack.to_string(), "acme/network/prod");

        let partial = with_labels(&[(PULUMI_ORGANIZATION_LABEL, "acme")]);
        assert!(pulumi_stack_from_manifest(&partial).is_err());

        assert_eq!(pulumi_stack_from_manifest(&with_labels(&[])).unwrap(), None);
    }

    #[test]
    fn test_invalid_fqdn() {
        let m = with_labels(&[(PULUMI_STACK_FQDN_LABEL, "acme/network")]);
        let err = pulumi_stack_from_manifest(&m).unwrap_err();
        assert!(err.to_string().contains("invalid stack.fqdn format"));
        assert!(PulumiStackFqdn::parse("a//c").is_err());
    }

    #[test]
    fn test_tofu_backend_labels() {
        let m = with_labels(&[
            (TOFU_BACKEND_TYPE_LABEL, "s3"),
            (TOFU_BACKEND_OBJECT_LABEL, "my-terraform-state/aws-vpc/dev"),
        ]);
        let backend = tofu_backend_from_manifest(&m).unwrap().unwrap();
        assert_eq!(backend.backend_type, BackendType::S3);
        assert_eq!(
            backend.backend_config_args(),
            vec!["bucket=my-terraform-state", "key=aws-vpc/dev"]
        );

        let m = with_labels(&[("other.label", "value")]);
        assert_eq!(tofu_backend_from_manifest(&m).unwrap(), None);
    }

    #[test]
    fn test_tofu_backend_requires_both() {
        let m = with_labels(&[(TOFU_BACKEND_TYPE_LABEL, "s3")]);
        let err = tofu_backend_from_manifest(&m).unwrap_err();
        assert!(err.to_string().contains("both"));

        let m = with_labels(&[(TOFU_BACKEND_OBJECT_LABEL, "bucket/key")]);
        assert!(tofu_backend_from_manifest(&m).unwrap_err().to_string().contains("both"));
    }

    #[test]
    fn test_tofu_backend_rejects_empty_and_unknown() {
        let m = with_labels(&[
            (TOFU_BACKEND_TYPE_LABEL, ""),
            (TOFU_BACKEND_OBJECT_LABEL, "bucket/key"),
        ]);
        let err = tofu_backend_from_manifest(&m).unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));

        let m = with_labels(&[
            (TOFU_BACKEND_TYPE_LABEL, "consul"),
            (TOFU_BACKEND_OBJECT_LABEL, "bucket/key"),
        ]);
        let err = tofu_backend_from_manifest(&m).unwrap_err();
        assert!(err.to_string().contains("unsupported backend type"));
    }

    #[test]
    fn test_backend_config_args_per_type() {
        let config = |backend_type| TofuBackendConfig {
            backend_type,
            backend_object: "container/path/to/state".to_string(),
        };
        assert_eq!(
            config(BackendType::Gcs).backend_config_args(),
            vec!["bucket=container", "prefix=path/to/state"]
        );
        assert_eq!(
            config(BackendType::Azurerm).backend_config_args(),
            vec!["container_name=container", "key=path/to/state"]
        );
        assert!(config(BackendType::Local).backend_config_args().is_empty());

        let bucket_only = TofuBackendConfig {
            backend_type: BackendType::S3,
            backend_object: "state-bucket".to_string(),
        };
        assert_eq!(bucket_only.backend_config_args(), vec!["bucket=state-bucket"]);
    }
}
