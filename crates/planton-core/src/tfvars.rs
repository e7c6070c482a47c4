//! Manifest → `terraform.tfvars`
//!
//! Each top-level manifest field becomes a Terraform variable with a
//! snake_case name. `apiVersion`, `kind` and `status` are not variables of
//! any module and are skipped.

use crate::error::{ManifestError, Result};
use crate::manifest::Manifest;
use serde_yaml::{Mapping, Value};
use std::fmt::Write;

const SKIPPED_TOP_LEVEL: [&str; 3] = ["apiVersion", "kind", "status"];

pub fn render_tfvars(manifest: &Manifest) -> Result<String> {
    let mut out = String::new();
    for (key, value) in manifest.root() {
        let key = key_str(key)?;
        if SKIPPED_TOP_LEVEL.contains(&key) {
            continue;
        }
        write_entry(&mut out, key, value, 0)?;
    }
    Ok(out)
}

/// camelCase → snake_case (`diskSize` → `disk_size`, `awsVPCId` → `aws_vpc_id`)
pub fn to_snake_case(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == ' ' {
            out.push('_');
            continue;
        }
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn write_entry(out: &mut String, key: &str, value: &Value, level: usize) -> Result<()> {
    let indent = "  ".repeat(level);
    let name = to_snake_case(key);

    match value {
        Value::Mapping(map) => {
            let _ = writeln!(out, "{indent}{name} = {{");
            write_mapping(out, map, level + 1)?;
            let _ = writeln!(out, "{indent}}}");
        }
        Value::Sequence(items) => {
            let _ = writeln!(out, "{indent}{name} = [");
            write_sequence(out, items, level + 1)?;
            let _ = writeln!(out, "{indent}]");
        }
        Value::Tagged(tagged) => write_entry(out, key, &tagged.value, level)?,
        scalar => {
            let _ = writeln!(out, "{indent}{name} = {}", scalar_literal(scalar));
        }
    }
    Ok(())
}

fn write_mapping(out: &mut String, map: &Mapping, level: usize) -> Result<()> {
    for (key, value) in map {
        write_entry(out, key_str(key)?, value, level)?;
    }
    Ok(())
}

fn write_sequence(out: &mut String, items: &[Value], level: usize) -> Result<()> {
    let indent = "  ".repeat(level);
    for item in items {
        let item = match item {
            Value::Tagged(tagged) => &tagged.value,
            other => other,
        };
        match item {
            Value::Mapping(map) => {
                let _ = writeln!(out, "{indent}{{");
                write_mapping(out, map, level + 1)?;
                let _ = writeln!(out, "{indent}}},");
            }
            Value::Sequence(inner) => {
                let _ = writeln!(out, "{indent}[");
                write_sequence(out, inner, level + 1)?;
                let _ = writeln!(out, "{indent}],");
            }
            scalar => {
                let _ = writeln!(out, "{indent}{},", scalar_literal(scalar));
            }
        }
    }
    Ok(())
}

fn scalar_literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        // containers are handled by the callers
        other => quote(&format!("{other:?}")),
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    // `${` and `%{` would start template interpolation
    out.replace("${", "$${").replace("%{", "%%{")
}

fn key_str(key: &Value) -> Result<&str> {
    key.as_str()
        .ok_or_else(|| ManifestError::Unsupported(format!("non-string key {key:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("diskSize"), "disk_size");
        assert_eq!(to_snake_case("isPersistenceEnabled"), "is_persistence_enabled");
        assert_eq!(to_snake_case("awsVPCId"), "aws_vpc_id");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("ipv4Cidr"), "ipv4_cidr");
    }

    #[test]
    fn test_render_nested_manifest() {
        let manifest = Manifest::from_yaml_str(
            r#"
apiVersion: kubernetes.project-planton.org/v1
kind: KubernetesRedis
metadata:
  name: red-one
  labels:
    env: production
spec:
  container:
    diskSize: 2Gi
    isPersistenceEnabled: true
    replicas: 1
  hosts:
    - a.example.com
    - b.example.com
  extra: null
status:
  outputs: {}
"#,
        )
        .unwrap();

        let expected = r#"metadata = {
  name = "red-one"
  labels = {
    env = "production"
  }
}
spec = {
  container = {
    disk_size = "2Gi"
    is_persistence_enabled = true
    replicas = 1
  }
  hosts = [
    "a.example.com",
    "b.example.com",
  ]
  extra = null
}
"#;
        assert_eq!(render_tfvars(&manifest).unwrap(), expected);
    }

    #[test]
    fn test_sequence_of_mappings() {
        let manifest = Manifest::from_yaml_str(
            "spec:\n  ports:\n    - containerPort: 80\n      name: http\n",
        )
        .unwrap();
        let expected = "spec = {\n  ports = [\n    {\n      container_port = 80\n      name = \"http\"\n    },\n  ]\n}\n";
        assert_eq!(render_tfvars(&manifest).unwrap(), expected);
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(quote("say \"hi\"\n"), r#""say \"hi\"\n""#);
        assert_eq!(quote("${var.x}"), r#""$${var.x}""#);
        assert_eq!(quote("100%{x}"), r#""100%%{x}""#);
    }
}
