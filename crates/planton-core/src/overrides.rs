//! `--set key=value` field overrides
//!
//! Overrides are collected into a `BTreeMap`, so a repeated key keeps its
//! last value and application order is lexicographic by key. The same flag
//! set therefore always produces the same manifest.

use crate::error::{ManifestError, Result};
use crate::manifest::Manifest;
use serde_yaml::{Mapping, Number, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::TempPath;

pub type Overrides = BTreeMap<String, String>;

/// Parses `key=value` entries; the value may itself contain `=`
pub fn parse_overrides<I, S>(entries: I) -> Result<Overrides>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut overrides = Overrides::new();
    for entry in entries {
        let entry = entry.as_ref();
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| ManifestError::InvalidOverride(entry.to_string()))?;
        let key = key.trim();
        if key.is_empty() || key.split('.').any(str::is_empty) {
            return Err(ManifestError::InvalidOverride(entry.to_string()));
        }
        overrides.insert(key.to_string(), value.to_string());
    }
    Ok(overrides)
}

/// Applies every override to the manifest in key order
pub fn apply_overrides(manifest: &mut Manifest, overrides: &Overrides) -> Result<()> {
    for (key, raw) in overrides {
        let segments: Vec<&str> = key.split('.').collect();
        let value = if is_string_map_entry(&segments) {
            Value::String(raw.clone())
        } else {
            coerce_scalar(raw)
        };
        set_in_mapping(manifest.root_mut(), key, &segments, value)?;
        tracing::debug!("applied override {}={}", key, raw);
    }
    Ok(())
}

/// Manifest path after overrides are applied
///
/// Owns the temp file when one had to be written; dropping it removes the file.
#[derive(Debug)]
pub enum OverriddenManifest {
    Original(PathBuf),
    Rewritten(TempPath),
}

impl OverriddenManifest {
    pub fn path(&self) -> &Path {
        match self {
            OverriddenManifest::Original(path) => path.as_path(),
            OverriddenManifest::Rewritten(temp) => temp,
        }
    }
}

/// Writes an overridden copy of `path` to a temp file
///
/// Without overrides the original path is returned untouched.
pub fn apply_overrides_to_file(path: &Path, overrides: &Overrides) -> Result<OverriddenManifest> {
    if overrides.is_empty() {
        return Ok(OverriddenManifest::Original(path.to_path_buf()));
    }

    let mut manifest = Manifest::load(path)?;
    apply_overrides(&mut manifest, overrides)?;

    let temp = tempfile::Builder::new()
        .prefix("manifest-overridden-")
        .suffix(".yaml")
        .tempfile()?
        .into_temp_path();
    manifest.write_to(&temp)?;

    Ok(OverriddenManifest::Rewritten(temp))
}

fn set_in_mapping(map: &mut Mapping, key: &str, segments: &[&str], value: Value) -> Result<()> {
    let (head, rest) = split_first(segments);

    if rest.is_empty() {
        map.insert(Value::String(head.to_string()), value);
        return Ok(());
    }

    let child = map
        .entry(Value::String(head.to_string()))
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if child.is_null() {
        *child = Value::Mapping(Mapping::new());
    }
    set_in_value(child, key, rest, value)
}

fn set_in_value(target: &mut Value, key: &str, segments: &[&str], value: Value) -> Result<()> {
    match target {
        Value::Mapping(map) => set_in_mapping(map, key, segments, value),
        Value::Sequence(items) => {
            let (head, rest) = split_first(segments);
            let index: usize = head.parse().map_err(|_| ManifestError::OverrideConflict {
                key: key.to_string(),
                reason: format!("'{head}' is not a list index"),
            })?;
            let len = items.len();
            let item = items
                .get_mut(index)
                .ok_or_else(|| ManifestError::OverrideConflict {
                    key: key.to_string(),
                    reason: format!("index {index} is out of range (list has {len} items)"),
                })?;

            if rest.is_empty() {
                *item = value;
                Ok(())
            } else {
                if item.is_null() {
                    *item = Value::Mapping(Mapping::new());
                }
                set_in_value(item, key, rest, value)
            }
        }
        _ => {
            let all: Vec<&str> = key.split('.').collect();
            let parent = all[..all.len().saturating_sub(segments.len())].join(".");
            Err(ManifestError::OverrideConflict {
                key: key.to_string(),
                reason: format!("'{parent}' is a scalar, not a mapping or list"),
            })
        }
    }
}

fn split_first<'a>(segments: &'a [&'a str]) -> (&'a str, &'a [&'a str]) {
    match segments.split_first() {
        Some((head, rest)) => (head, rest),
        None => ("", &[]),
    }
}

/// Label and annotation values are always strings
fn is_string_map_entry(segments: &[&str]) -> bool {
    matches!(segments, ["metadata", "labels" | "annotations", _])
}

/// `true`/`false`, `null`, integers and floats keep their type; everything else is a string
fn coerce_scalar(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }

    let digits = raw.strip_prefix('-').unwrap_or(raw);
    let leading_zero = digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.");
    if !leading_zero {
        if let Ok(int) = raw.parse::<i64>() {
            return Value::Number(Number::from(int));
        }
        if raw.contains('.')
            && let Ok(float) = raw.parse::<f64>()
            && float.is_finite()
        {
            return Value::Number(Number::from(float));
        }
    }

    Value::String(raw.to_string())
}
