//! `~/.project-planton/config.yaml`

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Settings persisted by `project-planton config set`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CliConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webapp_container_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webapp_version: Option<String>,
}

/// Keys accepted by `config get/set`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    BackendUrl,
    WebappContainerId,
    WebappVersion,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 3] = [
        ConfigKey::BackendUrl,
        ConfigKey::WebappContainerId,
        ConfigKey::WebappVersion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::BackendUrl => "backend-url",
            ConfigKey::WebappContainerId => "webapp-container-id",
            ConfigKey::WebappVersion => "webapp-version",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        ConfigKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownKey {
                key: s.to_string(),
                available: ConfigKey::ALL
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

impl CliConfig {
    /// Loads the config; a missing file yields the default config
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Writes the config, readable by the owner only
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!("saved config to {}", path.display());
        Ok(())
    }

    pub fn get(&self, key: ConfigKey) -> Option<&str> {
        match key {
            ConfigKey::BackendUrl => self.backend_url.as_deref(),
            ConfigKey::WebappContainerId => self.webapp_container_id.as_deref(),
            ConfigKey::WebappVersion => self.webapp_version.as_deref(),
        }
    }

    pub fn set(&mut self, key: ConfigKey, value: &str) -> Result<()> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                reason: "value cannot be empty".to_string(),
            });
        }

        match key {
            ConfigKey::BackendUrl => {
                if !value.starts_with("http://") && !value.starts_with("https://") {
                    return Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                        reason: "must start with http:// or https://".to_string(),
                    });
                }
                self.backend_url = Some(value.to_string());
            }
            ConfigKey::WebappContainerId => self.webapp_container_id = Some(value.to_string()),
            ConfigKey::WebappVersion => self.webapp_version = Some(value.to_string()),
        }
        Ok(())
    }

    /// Set values in key order
    pub fn entries(&self) -> Vec<(ConfigKey, &str)> {
        ConfigKey::ALL
            .into_iter()
            .filter_map(|k| self.get(k).map(|v| (k, v)))
            .collect()
    }

    /// Backend URL or an error telling the user how to set it
    pub fn backend_url(&self) -> Result<&str> {
        self.get(ConfigKey::BackendUrl)
            .ok_or_else(|| ConfigError::NotSet(ConfigKey::BackendUrl.to_string()))
    }
}
