//! Provider credentials
//!
//! Credentials reach a module as a provider config YAML file per cloud
//! provider. They come from `--<provider>-provider-config` flags,
//! `<provider>-provider-config.yaml` files in `--input-dir`, or the
//! provider's usual environment variables.

use crate::error::{IacError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use planton_core::Provider;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// Providers that accept a provider config file
pub const CONFIGURABLE_PROVIDERS: [Provider; 9] = [
    Provider::Atlas,
    Provider::Auth0,
    Provider::Aws,
    Provider::Azure,
    Provider::Cloudflare,
    Provider::Confluent,
    Provider::Gcp,
    Provider::Kubernetes,
    Provider::Snowflake,
];

/// Account id used when neither `AWS_ACCOUNT_ID` nor STS yields one
pub const AWS_PLACEHOLDER_ACCOUNT_ID: &str = "000000000000";

const AWS_DEFAULT_REGION: &str = "us-east-1";

/// Provider config file per provider
///
/// Files generated from environment variables are temporary and removed
/// when the options are dropped.
#[derive(Debug, Default)]
pub struct ProviderConfigOptions {
    configs: BTreeMap<&'static str, PathBuf>,
    generated: Vec<TempPath>,
}

impl ProviderConfigOptions {
    pub fn set(&mut self, provider: Provider, path: PathBuf) {
        self.configs.insert(provider.as_str(), path);
    }

    pub fn config_for(&self, provider: Provider) -> Option<&Path> {
        self.configs.get(provider.as_str()).map(PathBuf::as_path)
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Configured providers with their files, in name order
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &Path)> {
        self.configs.iter().map(|(name, path)| (*name, path.as_path()))
    }

    /// Flag values; empty strings count as unset
    pub fn from_flags<I>(flags: I) -> Self
    where
        I: IntoIterator<Item = (Provider, Option<PathBuf>)>,
    {
        let mut options = Self::default();
        for (provider, path) in flags {
            if let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) {
                options.set(provider, path);
            }
        }
        options
    }

    /// `<dir>/<provider>-provider-config.yaml` files that exist
    pub fn from_input_dir(dir: &Path) -> Self {
        let mut options = Self::default();
        for provider in CONFIGURABLE_PROVIDERS {
            let path = dir.join(format!("{}-provider-config.yaml", provider.as_str()));
            if path.is_file() {
                options.set(provider, path);
            }
        }
        options
    }

    /// Fills providers that are still missing from AWS, GCP and Azure
    /// environment variables
    ///
    /// Runs on the blocking pool since the AWS account lookup shells out to
    /// `aws sts`.
    pub async fn with_env_fallback(self) -> Result<Self> {
        tokio::task::spawn_blocking(move || {
            self.fill_from_lookup(|key| std::env::var(key).ok(), aws_account_id_from_sts)
        })
        .await
        .map_err(|e| IacError::Io(std::io::Error::other(e)))?
    }

    /// Env-derived options only, with injectable variable and STS lookups
    pub fn from_lookup<L, A>(lookup: L, aws_account_id: A) -> Result<Self>
    where
        L: Fn(&str) -> Option<String>,
        A: Fn(&AwsCredentials) -> Option<String>,
    {
        Self::default().fill_from_lookup(lookup, aws_account_id)
    }

    /// Generates configs for providers not already set; set ones are never
    /// looked up
    pub fn fill_from_lookup<L, A>(mut self, lookup: L, aws_account_id: A) -> Result<Self>
    where
        L: Fn(&str) -> Option<String>,
        A: Fn(&AwsCredentials) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if self.config_for(Provider::Aws).is_none()
            && let (Some(access_key_id), Some(secret_access_key)) =
                (var("AWS_ACCESS_KEY_ID"), var("AWS_SECRET_ACCESS_KEY"))
        {
            let credentials = AwsCredentials {
                access_key_id,
                secret_access_key,
                region: var("AWS_REGION")
                    .or_else(|| var("AWS_DEFAULT_REGION"))
                    .unwrap_or_else(|| AWS_DEFAULT_REGION.to_string()),
                session_token: var("AWS_SESSION_TOKEN"),
            };
            let account_id = var("AWS_ACCOUNT_ID")
                .or_else(|| aws_account_id(&credentials))
                .unwrap_or_else(|| {
                    tracing::warn!(
                        "Could not determine AWS account id, set AWS_ACCOUNT_ID to avoid the placeholder"
                    );
                    AWS_PLACEHOLDER_ACCOUNT_ID.to_string()
                });

            let mut config = Mapping::new();
            config.insert("accountId".into(), account_id.into());
            config.insert("accessKeyId".into(), credentials.access_key_id.into());
            config.insert(
                "secretAccessKey".into(),
                credentials.secret_access_key.into(),
            );
            config.insert("region".into(), credentials.region.into());
            if let Some(token) = credentials.session_token {
                config.insert("sessionToken".into(), token.into());
            }
            self.generate(Provider::Aws, &config)?;
        }

        if self.config_for(Provider::Gcp).is_none()
            && let Some(key) = gcp_key(&var)
        {
            let mut config = Mapping::new();
            config.insert(
                "serviceAccountKeyBase64".into(),
                BASE64.encode(key.as_bytes()).into(),
            );
            self.generate(Provider::Gcp, &config)?;
        }

        if self.config_for(Provider::Azure).is_none()
            && let (Some(client_id), Some(client_secret), Some(tenant_id), Some(subscription_id)) = (
                var("ARM_CLIENT_ID"),
                var("ARM_CLIENT_SECRET"),
                var("ARM_TENANT_ID"),
                var("ARM_SUBSCRIPTION_ID"),
            )
        {
            let mut config = Mapping::new();
            config.insert("clientId".into(), client_id.into());
            config.insert("clientSecret".into(), client_secret.into());
            config.insert("tenantId".into(), tenant_id.into());
            config.insert("subscriptionId".into(), subscription_id.into());
            self.generate(Provider::Azure, &config)?;
        }

        Ok(self)
    }

    fn generate(&mut self, provider: Provider, config: &Mapping) -> Result<()> {
        let mut file = tempfile::Builder::new()
            .prefix(&format!("{}-provider-config-", provider.as_str()))
            .suffix(".yaml")
            .tempfile()?;
        file.write_all(serde_yaml::to_string(config)?.as_bytes())?;

        let path = file.into_temp_path();
        self.set(provider, path.to_path_buf());
        self.generated.push(path);
        Ok(())
    }

    /// Combine two option sets; entries in `self` take precedence
    pub fn merge(mut self, lower: ProviderConfigOptions) -> Self {
        for (name, path) in lower.configs {
            self.configs.entry(name).or_insert(path);
        }
        self.generated.extend(lower.generated);
        self
    }

    /// Credentials as the environment variables Terraform providers read
    pub fn to_env_vars(&self) -> Result<ProviderEnv> {
        let mut env = ProviderEnv::default();

        for (name, path) in &self.configs {
            let config = read_config(name, path)?;
            let field = |key: &str| config.get(key).and_then(Value::as_str).map(str::to_string);

            match *name {
                "aws" => {
                    env.push_opt("AWS_ACCESS_KEY_ID", field("accessKeyId"));
                    env.push_opt("AWS_SECRET_ACCESS_KEY", field("secretAccessKey"));
                    env.push_opt("AWS_SESSION_TOKEN", field("sessionToken"));
                    if let Some(region) = field("region") {
                        env.push("AWS_REGION", region.clone());
                        env.push("AWS_DEFAULT_REGION", region);
                    }
                }
                "gcp" => {
                    if let Some(encoded) = field("serviceAccountKeyBase64") {
                        let decoded = BASE64.decode(encoded.trim()).map_err(|e| {
                            IacError::ProviderConfig {
                                provider: name.to_string(),
                                path: path.clone(),
                                reason: format!("serviceAccountKeyBase64 is not valid base64: {e}"),
                            }
                        })?;
                        env.push(
                            "GOOGLE_CREDENTIALS",
                            String::from_utf8_lossy(&decoded).to_string(),
                        );
                    }
                }
                "azure" => {
                    env.push_opt("ARM_CLIENT_ID", field("clientId"));
                    env.push_opt("ARM_CLIENT_SECRET", field("clientSecret"));
                    env.push_opt("ARM_TENANT_ID", field("tenantId"));
                    env.push_opt("ARM_SUBSCRIPTION_ID", field("subscriptionId"));
                }
                "cloudflare" => {
                    env.push_opt("CLOUDFLARE_API_TOKEN", field("apiToken"));
                }
                "kubernetes" => {
                    if let Some(kubeconfig) = field("kubeconfig") {
                        let mut file = tempfile::Builder::new().prefix("kubeconfig-").tempfile()?;
                        file.write_all(kubeconfig.as_bytes())?;
                        let path = file.into_temp_path();
                        env.push("KUBE_CONFIG_PATH", path.to_string_lossy().to_string());
                        env.files.push(path);
                    }
                }
                _ => {
                    tracing::debug!(provider = *name, "No environment mapping for provider config");
                }
            }
        }

        Ok(env)
    }
}

/// Service account key from `GOOGLE_APPLICATION_CREDENTIALS`, else the
/// inline `GOOGLE_CREDENTIALS`
fn gcp_key(var: impl Fn(&str) -> Option<String>) -> Option<String> {
    if let Some(path) = var("GOOGLE_APPLICATION_CREDENTIALS") {
        match std::fs::read_to_string(&path) {
            Ok(key) => return Some(key),
            Err(e) => tracing::warn!(
                path = %path,
                error = %e,
                "Ignoring unreadable GOOGLE_APPLICATION_CREDENTIALS"
            ),
        }
    }
    var("GOOGLE_CREDENTIALS")
}

fn read_config(provider: &str, path: &Path) -> Result<Mapping> {
    let content = std::fs::read_to_string(path)?;
    match serde_yaml::from_str::<Value>(&content)? {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        _ => Err(IacError::ProviderConfig {
            provider: provider.to_string(),
            path: path.to_path_buf(),
            reason: "expected a YAML mapping".to_string(),
        }),
    }
}

#[derive(Debug, Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub session_token: Option<String>,
}

/// `aws sts get-caller-identity` with the given credentials
pub fn aws_account_id_from_sts(credentials: &AwsCredentials) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct CallerIdentity {
        #[serde(rename = "Account")]
        account: String,
    }

    let mut cmd = std::process::Command::new("aws");
    cmd.args(["sts", "get-caller-identity", "--output", "json"])
        .env("AWS_ACCESS_KEY_ID", &credentials.access_key_id)
        .env("AWS_SECRET_ACCESS_KEY", &credentials.secret_access_key)
        .env("AWS_DEFAULT_REGION", &credentials.region);
    if let Some(token) = &credentials.session_token {
        cmd.env("AWS_SESSION_TOKEN", token);
    }

    tracing::debug!("Running: aws sts get-caller-identity --output json");

    let output = cmd.output().ok()?;
    if !output.status.success() {
        tracing::debug!(
            "aws sts get-caller-identity failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return None;
    }

    serde_json::from_slice::<CallerIdentity>(&output.stdout)
        .ok()
        .map(|identity| identity.account)
        .filter(|account| !account.is_empty())
}

/// Environment variables for a provisioner run
///
/// Owns any files the variables point at.
#[derive(Debug, Default)]
pub struct ProviderEnv {
    pub vars: Vec<(String, String)>,
    files: Vec<TempPath>,
}

impl ProviderEnv {
    fn push(&mut self, key: &str, value: String) {
        self.vars.push((key.to_string(), value));
    }

    fn push_opt(&mut self, key: &str, value: Option<String>) {
        if let Some(value) = value {
            self.push(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
