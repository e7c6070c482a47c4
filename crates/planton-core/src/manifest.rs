//! Kubernetes-style resource manifest
//!
//! The manifest is kept as an untyped YAML mapping. Per-kind schemas live
//! with the IaC modules, so the CLI only inspects the envelope fields
//! (`apiVersion`, `kind`, `metadata`, `spec`) and forwards the rest as is.

use crate::error::{ManifestError, Result};
use crate::kind::CloudResourceKind;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    root: Mapping,
}

impl Manifest {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Err(ManifestError::Empty);
        }

        let value: Value = serde_yaml::from_str(content)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Mapping(root) => Ok(Self { root }),
            Value::Null => Err(ManifestError::Empty),
            _ => Err(ManifestError::NotAMapping),
        }
    }

    /// Reads a manifest from a local file
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!("loading manifest from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.root)?)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_yaml_string()?)?;
        Ok(())
    }

    pub fn as_value(&self) -> Value {
        Value::Mapping(self.root.clone())
    }

    pub fn root(&self) -> &Mapping {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Mapping {
        &mut self.root
    }

    pub fn api_version(&self) -> Option<&str> {
        self.root.get("apiVersion").and_then(Value::as_str)
    }

    pub fn kind(&self) -> Option<&str> {
        self.root.get("kind").and_then(Value::as_str)
    }

    /// Registry entry for `kind`, with a descriptive error for unknown kinds
    pub fn cloud_resource_kind(&self) -> Result<CloudResourceKind> {
        CloudResourceKind::resolve(self.kind().unwrap_or_default())
    }

    pub fn metadata(&self) -> Option<&Mapping> {
        self.root.get("metadata").and_then(Value::as_mapping)
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata()
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
    }

    /// `metadata.labels`; non-string values are skipped
    pub fn labels(&self) -> BTreeMap<String, String> {
        self.metadata()
            .and_then(|m| m.get("labels"))
            .and_then(Value::as_mapping)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|(k, v)| Some((k.as_str()?.to_string(), v.as_str()?.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn label(&self, key: &str) -> Option<String> {
        self.labels().remove(key)
    }

    pub fn spec(&self) -> Option<&Value> {
        self.root.get("spec")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
apiVersion: aws.project-planton.org/v1
kind: AwsS3Bucket
metadata:
  name: logs-bucket
  labels:
    project-planton.org/provisioner: pulumi
    replicas: 3
spec:
  awsRegion: us-east-1
"#;

    #[test]
    fn test_envelope_accessors() {
        let manifest = Manifest::from_yaml_str(MANIFEST).unwrap();
        assert_eq!(manifest.api_version(), Some("aws.project-planton.org/v1"));
        assert_eq!(manifest.kind(), Some("AwsS3Bucket"));
        assert_eq!(manifest.name(), Some("logs-bucket"));
        assert_eq!(
            manifest.cloud_resource_kind().unwrap().name(),
            "AwsS3Bucket"
        );
        assert!(manifest.spec().is_some());

        // only string labels are exposed
        let labels = manifest.labels();
        assert_eq!(labels.len(), 1);
        assert_eq!(
            manifest.label("project-planton.org/provisioner").as_deref(),
            Some("pulumi")
        );
    }

    #[test]
    fn test_empty_and_non_mapping_documents() {
        assert!(matches!(
            Manifest::from_yaml_str("   \n"),
            Err(ManifestError::Empty)
        ));
        assert!(matches!(
            Manifest::from_yaml_str("~"),
            Err(ManifestError::Empty)
        ));
        assert!(matches!(
            Manifest::from_yaml_str("- a\n- b\n"),
            Err(ManifestError::NotAMapping)
        ));
    }

    #[test]
    fn test_load_and_write_preserve_key_order() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("manifest.yaml");
        std::fs::write(&path, MANIFEST).unwrap();

        let manifest = Manifest::load(&path).unwrap();
        let out = temp_dir.path().join("out.yaml");
        manifest.write_to(&out).unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        let api_pos = written.find("apiVersion").unwrap();
        let spec_pos = written.find("spec").unwrap();
        assert!(api_pos < spec_pos);
        assert_eq!(Manifest::load(&out).unwrap(), manifest);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Manifest::load(Path::new("/nonexistent/manifest.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/manifest.yaml"));
    }
}
