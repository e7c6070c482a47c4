//! Envelope validation
//!
//! Field-level schemas belong to each resource module; here we only check
//! what the CLI itself relies on.

use crate::error::{ManifestError, Result};
use crate::kind::CloudResourceKind;
use crate::manifest::Manifest;
use serde_yaml::Value;

const MAX_NAME_LEN: usize = 63;

const API_VERSION_SUFFIX: &str = ".project-planton.org/v1";

/// `<provider>.project-planton.org/v1`
fn is_valid_api_version(api_version: &str) -> bool {
    api_version
        .strip_suffix(API_VERSION_SUFFIX)
        .is_some_and(|provider| {
            !provider.is_empty()
                && provider
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        })
}

/// DNS label: lowercase alphanumerics and '-', not starting or ending with '-'
fn is_valid_name(name: &str) -> bool {
    !name.starts_with('-')
        && !name.ends_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Collects every violation and reports them together
pub fn validate(manifest: &Manifest) -> Result<()> {
    let mut violations = Vec::new();

    let api_version = manifest.api_version().unwrap_or_default();
    if api_version.is_empty() {
        violations.push("apiVersion is required".to_string());
    } else if !is_valid_api_version(api_version) {
        violations.push(format!(
            "apiVersion '{api_version}' must look like <provider>.project-planton.org/v1"
        ));
    }

    match manifest.kind().filter(|k| !k.is_empty()) {
        None => violations.push("kind is required".to_string()),
        Some(kind) => match CloudResourceKind::from_name(kind) {
            None => violations.push(format!("kind '{kind}' is not a supported cloud resource kind")),
            Some(known) => {
                if is_valid_api_version(api_version) && api_version != known.api_version() {
                    violations.push(format!(
                        "apiVersion '{api_version}' does not match kind {kind} (expected {})",
                        known.api_version()
                    ));
                }
            }
        },
    }

    match manifest.metadata() {
        None => violations.push("metadata is required".to_string()),
        Some(metadata) => {
            match metadata.get("name").and_then(Value::as_str) {
                None | Some("") => violations.push("metadata.name is required".to_string()),
                Some(name) if name.len() > MAX_NAME_LEN => violations.push(format!(
                    "metadata.name '{name}' exceeds {MAX_NAME_LEN} characters"
                )),
                Some(name) if !is_valid_name(name) => violations.push(format!(
                    "metadata.name '{name}' must contain only lowercase letters, digits and '-'"
                )),
                Some(_) => {}
            }

            if let Some(labels) = metadata.get("labels") {
                match labels.as_mapping() {
                    Some(labels) => {
                        for (key, value) in labels {
                            if !value.is_string() {
                                violations.push(format!(
                                    "metadata.labels.{} must be a string",
                                    key.as_str().unwrap_or("<non-string key>")
                                ));
                            }
                        }
                    }
                    None => violations.push("metadata.labels must be a mapping".to_string()),
                }
            }
        }
    }

    match manifest.spec() {
        None => violations.push("spec is required".to_string()),
        Some(spec) if !spec.is_mapping() => violations.push("spec must be a mapping".to_string()),
        Some(_) => {}
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ManifestError::Validation(violations))
    }
}
