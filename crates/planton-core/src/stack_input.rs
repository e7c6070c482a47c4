//! Stack input: the manifest plus provider credentials
//!
//! ```yaml
//! target:
//!   apiVersion: aws.project-planton.org/v1
//!   kind: AwsVpc
//!   ...
//! awsProviderConfig:
//!   accessKeyId: ...
//! ```
//!
//! Each credential sits under `<provider>ProviderConfig`.

use crate::error::{ManifestError, Result};
use crate::kind::Provider;
use crate::manifest::Manifest;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::Path;

const TARGET_KEY: &str = "target";
const PROVIDER_CONFIG_SUFFIX: &str = "ProviderConfig";

#[derive(Debug, Clone, PartialEq)]
pub struct StackInput {
    pub target: Manifest,
    /// Provider configs keyed by provider name (`aws`, `gcp`, ...)
    pub provider_configs: BTreeMap<String, Value>,
}

impl StackInput {
    pub fn new(target: Manifest) -> Self {
        Self {
            target,
            provider_configs: BTreeMap::new(),
        }
    }

    /// Reads a provider config YAML file into `<provider>ProviderConfig`
    pub fn with_provider_config_file(mut self, provider: Provider, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.provider_configs
            .insert(provider.as_str().to_string(), serde_yaml::from_str(&content)?);
        Ok(self)
    }

    pub fn provider_config(&self, provider: Provider) -> Option<&Value> {
        self.provider_configs.get(provider.as_str())
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        let mut root = Mapping::new();
        root.insert(Value::from(TARGET_KEY), self.target.as_value());
        for (provider, config) in &self.provider_configs {
            root.insert(
                Value::from(format!("{provider}{PROVIDER_CONFIG_SUFFIX}")),
                config.clone(),
            );
        }
        Ok(serde_yaml::to_string(&root)?)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let root = match serde_yaml::from_str::<Value>(content)? {
            Value::Mapping(root) => root,
            Value::Null => return Err(ManifestError::Empty),
            _ => return Err(ManifestError::NotAMapping),
        };

        let target = root
            .get(TARGET_KEY)
            .cloned()
            .ok_or(ManifestError::MissingTarget)?;

        let provider_configs = root
            .iter()
            .filter_map(|(key, value)| {
                let provider = key.as_str()?.strip_suffix(PROVIDER_CONFIG_SUFFIX)?;
                (!provider.is_empty()).then(|| (provider.to_string(), value.clone()))
            })
            .collect();

        Ok(Self {
            target: Manifest::from_value(target)?,
            provider_configs,
        })
    }
}

/// Pulls the `target` manifest out of a stack input file
pub fn extract_target(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(StackInput::from_yaml_str(&content)?.target)
}
