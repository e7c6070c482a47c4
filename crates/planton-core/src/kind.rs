//! Cloud resource kind registry
//!
//! Every manifest names a `kind` (e.g. `AwsS3Bucket`). The registry maps the
//! kind to its provider, which decides both the expected `apiVersion` and
//! where the IaC module lives inside the modules repository.

use crate::error::{ManifestError, Result};
use crate::labels::ProvisionerType;
use std::fmt;

/// Cloud provider owning a resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Atlas,
    Auth0,
    Aws,
    Azure,
    Civo,
    Cloudflare,
    Confluent,
    DigitalOcean,
    Gcp,
    Kubernetes,
    Snowflake,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Atlas => "atlas",
            Provider::Auth0 => "auth0",
            Provider::Aws => "aws",
            Provider::Azure => "azure",
            Provider::Civo => "civo",
            Provider::Cloudflare => "cloudflare",
            Provider::Confluent => "confluent",
            Provider::DigitalOcean => "digitalocean",
            Provider::Gcp => "gcp",
            Provider::Kubernetes => "kubernetes",
            Provider::Snowflake => "snowflake",
        }
    }

    /// `apiVersion` every kind of this provider must declare
    pub fn api_version(&self) -> String {
        format!("{}.project-planton.org/v1", self.as_str())
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const KINDS: &[(&str, Provider)] = &[
    ("MongodbAtlas", Provider::Atlas),
    ("Auth0Client", Provider::Auth0),
    ("Auth0Connection", Provider::Auth0),
    ("AwsAlb", Provider::Aws),
    ("AwsCertManagerCert", Provider::Aws),
    ("AwsCloudFront", Provider::Aws),
    ("AwsDynamodb", Provider::Aws),
    ("AwsEcrRepo", Provider::Aws),
    ("AwsEcsCluster", Provider::Aws),
    ("AwsEcsService", Provider::Aws),
    ("AwsEksCluster", Provider::Aws),
    ("AwsIamRole", Provider::Aws),
    ("AwsLambda", Provider::Aws),
    ("AwsRdsCluster", Provider::Aws),
    ("AwsRdsInstance", Provider::Aws),
    ("AwsRoute53Zone", Provider::Aws),
    ("AwsS3Bucket", Provider::Aws),
    ("AwsSecretsManager", Provider::Aws),
    ("AwsSecurityGroup", Provider::Aws),
    ("AwsStaticWebsite", Provider::Aws),
    ("AwsVpc", Provider::Aws),
    ("AzureAksCluster", Provider::Azure),
    ("AzureDnsZone", Provider::Azure),
    ("AzureKeyVault", Provider::Azure),
    ("AzureNatGateway", Provider::Azure),
    ("AzureVpc", Provider::Azure),
    ("CivoKubernetesCluster", Provider::Civo),
    ("CivoVpc", Provider::Civo),
    ("CloudflareDnsZone", Provider::Cloudflare),
    ("CloudflareR2Bucket", Provider::Cloudflare),
    ("CloudflareWorker", Provider::Cloudflare),
    ("ConfluentKafka", Provider::Confluent),
    ("DigitalOceanAppPlatformService", Provider::DigitalOcean),
    ("DigitalOceanKubernetesCluster", Provider::DigitalOcean),
    ("DigitalOceanVpc", Provider::DigitalOcean),
    ("GcpArtifactRegistryRepo", Provider::Gcp),
    ("GcpCertManagerCert", Provider::Gcp),
    ("GcpCloudCdn", Provider::Gcp),
    ("GcpCloudFunction", Provider::Gcp),
    ("GcpCloudRun", Provider::Gcp),
    ("GcpCloudSql", Provider::Gcp),
    ("GcpDnsZone", Provider::Gcp),
    ("GcpGcsBucket", Provider::Gcp),
    ("GcpGkeAddonBundle", Provider::Gcp),
    ("GcpGkeCluster", Provider::Gcp),
    ("GcpRouterNat", Provider::Gcp),
    ("GcpSecretsManager", Provider::Gcp),
    ("GcpVpc", Provider::Gcp),
    ("KubernetesArgocd", Provider::Kubernetes),
    ("KubernetesCertManager", Provider::Kubernetes),
    ("KubernetesCronJob", Provider::Kubernetes),
    ("KubernetesDaemonSet", Provider::Kubernetes),
    ("KubernetesDeployment", Provider::Kubernetes),
    ("KubernetesElasticsearch", Provider::Kubernetes),
    ("KubernetesExternalDns", Provider::Kubernetes),
    ("KubernetesExternalSecrets", Provider::Kubernetes),
    ("KubernetesGhaRunnerScaleSet", Provider::Kubernetes),
    ("KubernetesGhaRunnerScaleSetController", Provider::Kubernetes),
    ("KubernetesGitlab", Provider::Kubernetes),
    ("KubernetesHarbor", Provider::Kubernetes),
    ("KubernetesHelmRelease", Provider::Kubernetes),
    ("KubernetesIstio", Provider::Kubernetes),
    ("KubernetesJenkins", Provider::Kubernetes),
    ("KubernetesJob", Provider::Kubernetes),
    ("KubernetesKafka", Provider::Kubernetes),
    ("KubernetesKeycloak", Provider::Kubernetes),
    ("KubernetesMongodb", Provider::Kubernetes),
    ("KubernetesNamespace", Provider::Kubernetes),
    ("KubernetesNats", Provider::Kubernetes),
    ("KubernetesNeo4j", Provider::Kubernetes),
    ("KubernetesOpenFga", Provider::Kubernetes),
    ("KubernetesPostgres", Provider::Kubernetes),
    ("KubernetesPrometheus", Provider::Kubernetes),
    ("KubernetesRedis", Provider::Kubernetes),
    ("KubernetesSignoz", Provider::Kubernetes),
    ("KubernetesSolr", Provider::Kubernetes),
    ("KubernetesSolrOperator", Provider::Kubernetes),
    ("KubernetesStatefulSet", Provider::Kubernetes),
    ("KubernetesTekton", Provider::Kubernetes),
    ("KubernetesTemporal", Provider::Kubernetes),
    ("KubernetesZalandoPostgresOperator", Provider::Kubernetes),
    ("SnowflakeDatabase", Provider::Snowflake),
];

/// A known cloud resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CloudResourceKind {
    name: &'static str,
    provider: Provider,
}

impl CloudResourceKind {
    /// Looks up a kind by its exact (case-sensitive) name
    pub fn from_name(name: &str) -> Option<Self> {
        KINDS
            .iter()
            .find(|(kind, _)| *kind == name)
            .map(|(kind, provider)| CloudResourceKind {
                name: kind,
                provider: *provider,
            })
    }

    /// Like `from_name`, but unknown kinds become a descriptive error
    pub fn resolve(name: &str) -> Result<Self> {
        Self::from_name(name)
            .ok_or_else(|| ManifestError::UnsupportedKind(unsupported_kind_message(name)))
    }

    pub fn all() -> impl Iterator<Item = CloudResourceKind> {
        KINDS.iter().map(|(name, provider)| CloudResourceKind {
            name,
            provider: *provider,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn api_version(&self) -> String {
        self.provider.api_version()
    }

    /// Module location relative to the modules repository root
    pub fn module_subdir(&self, provisioner: ProvisionerType) -> String {
        let iac_dir = match provisioner {
            ProvisionerType::Pulumi => "pulumi",
            ProvisionerType::Tofu | ProvisionerType::Terraform => "tf",
        };
        format!(
            "apis/org/project_planton/provider/{}/{}/v1/iac/{}",
            self.provider.as_str(),
            self.name.to_lowercase(),
            iac_dir
        )
    }
}

impl fmt::Display for CloudResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

fn unsupported_kind_message(name: &str) -> String {
    let mut msg = format!("unsupported cloud resource kind: '{name}'\n\n");

    if let Some(suggestion) = closest_kind(name) {
        msg.push_str(&format!("Did you mean '{suggestion}'?\n\n"));
    }

    msg.push_str(
        "How to fix:\n\
         1. Check the 'kind' field for typos (extra characters, wrong capitalization)\n\
         2. If the kind is correct, upgrade the CLI: project-planton upgrade\n\
         3. Retry your command",
    );
    msg
}

/// Case-insensitive match, or a kind that differs only by a trailing character
fn closest_kind(name: &str) -> Option<&'static str> {
    let lower = name.to_lowercase();
    KINDS
        .iter()
        .map(|(kind, _)| *kind)
        .find(|kind| {
            let kind_lower = kind.to_lowercase();
            kind_lower == lower
                || lower.strip_suffix('s') == Some(kind_lower.as_str())
                || kind_lower.strip_suffix('s') == Some(lower.as_str())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_exact() {
        let kind = CloudResourceKind::from_name("AwsS3Bucket").unwrap();
        assert_eq!(kind.provider(), Provider::Aws);
        assert_eq!(kind.api_version(), "aws.project-planton.org/v1");
        assert!(CloudResourceKind::from_name("awss3bucket").is_none());
    }

    #[test]
    fn test_module_subdir() {
        let kind = CloudResourceKind::from_name("KubernetesPostgres").unwrap();
        assert_eq!(
            kind.module_subdir(ProvisionerType::Pulumi),
            "apis/org/project_planton/provider/kubernetes/kubernetespostgres/v1/iac/pulumi"
        );
        assert_eq!(
            kind.module_subdir(ProvisionerType::Tofu),
            "apis/org/project_planton/provider/kubernetes/kubernetespostgres/v1/iac/tf"
        );
        assert_eq!(
            kind.module_subdir(ProvisionerType::Terraform),
            kind.module_subdir(ProvisionerType::Tofu)
        );
    }

    #[test]
    fn test_unsupported_kind_suggests_fix() {
        let err = CloudResourceKind::resolve("AwsEksClusters").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("unsupported cloud resource kind: 'AwsEksClusters'"));
        assert!(message.contains("Did you mean 'AwsEksCluster'?"));
        assert!(message.contains("project-planton upgrade"));

        let err = CloudResourceKind::resolve("AwsEKSCluster").unwrap_err();
        assert!(err.to_string().contains("Did you mean 'AwsEksCluster'?"));

        let err = CloudResourceKind::resolve("Nothing").unwrap_err();
        assert!(!err.to_string().contains("Did you mean"));
    }

    #[test]
    fn test_registry_names_are_unique() {
        let mut names: Vec<_> = CloudResourceKind::all().map(|k| k.name()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}
