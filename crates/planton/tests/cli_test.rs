#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! once assert_cmd 2.1 is the floor

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const VALID_MANIFEST: &str = r#"apiVersion: aws.project-planton.org/v1
kind: AwsVpc
metadata:
  name: main-vpc
  labels:
    project-planton.org/provisioner: tofu
spec:
  vpcCidr: 10.0.0.0/16
  isNatGatewayEnabled: false
"#;

fn planton(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("project-planton").unwrap();
    cmd.env("PROJECT_PLANTON_HOME", home).env("NO_COLOR", "1");
    cmd
}

fn write_manifest(dir: &TempDir, content: &str) -> String {
    let path = dir.path().join("manifest.yaml");
    std::fs::write(&path, content).unwrap();
    path.display().to_string()
}

/// Top-level help lists every command
#[test]
fn test_cli_help() {
    let home = TempDir::new().unwrap();
    planton(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("refresh"))
        .stdout(predicate::str::contains("destroy"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("load-manifest"))
        .stdout(predicate::str::contains("modules"))
        .stdout(predicate::str::contains("upgrade"));
}

#[test]
fn test_cli_version() {
    let home = TempDir::new().unwrap();
    planton(home.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("project-planton"));
}

/// Provisioning commands share the manifest and override flags
#[test]
fn test_plan_help() {
    let home = TempDir::new().unwrap();
    planton(home.path())
        .args(["plan", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--manifest"))
        .stdout(predicate::str::contains("--set"))
        .stdout(predicate::str::contains("--module-dir"))
        .stdout(predicate::str::contains("--kustomize-dir"));
}

#[test]
fn test_command_aliases() {
    let home = TempDir::new().unwrap();
    for alias in ["update", "preview", "delete"] {
        planton(home.path())
            .args([alias, "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--auto-approve"));
    }
}

#[test]
fn test_validate_valid_manifest() {
    let home = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(&dir, VALID_MANIFEST);

    planton(home.path())
        .args(["validate", "-f", &manifest])
        .assert()
        .success()
        .stdout(predicate::str::contains("Manifest is valid"))
        .stdout(predicate::str::contains("AwsVpc"))
        .stdout(predicate::str::contains("main-vpc"))
        .stdout(predicate::str::contains("tofu"));
}

#[test]
fn test_validate_reports_violations() {
    let home = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(
        &dir,
        "apiVersion: aws.project-planton.org/v1\nkind: NotAKind\nmetadata:\n  name: Bad_Name\n",
    );

    planton(home.path())
        .args(["validate", "--manifest", &manifest])
        .assert()
        .failure()
        .stderr(predicate::str::contains("manifest validation failed"))
        .stderr(predicate::str::contains("NotAKind"))
        .stderr(predicate::str::contains("spec is required"));
}

#[test]
fn test_validate_missing_file() {
    let home = TempDir::new().unwrap();
    planton(home.path())
        .args(["validate", "-f", "/nonexistent/manifest.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("manifest file not found"));
}

#[test]
fn test_validate_from_piped_stdin() {
    let home = TempDir::new().unwrap();
    planton(home.path())
        .arg("validate")
        .write_stdin(VALID_MANIFEST)
        .assert()
        .success()
        .stdout(predicate::str::contains("Manifest is valid"));
}

#[test]
fn test_empty_stdin_is_rejected() {
    let home = TempDir::new().unwrap();
    planton(home.path())
        .arg("validate")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("stdin is empty"));
}

#[test]
fn test_kustomize_requires_overlay() {
    let home = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    planton(home.path())
        .args(["validate", "--kustomize-dir"])
        .arg(dir.path())
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--overlay is required"));
}

#[test]
fn test_load_manifest_applies_overrides() {
    let home = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(&dir, VALID_MANIFEST);

    planton(home.path())
        .args(["load-manifest", "-f", &manifest])
        .args(["--set", "spec.vpcCidr=10.1.0.0/16"])
        .args(["--set", "metadata.name=edge-vpc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("10.1.0.0/16"))
        .stdout(predicate::str::contains("edge-vpc"))
        .stdout(predicate::str::contains("main-vpc").not());
}

#[test]
fn test_load_manifest_rejects_malformed_override() {
    let home = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(&dir, VALID_MANIFEST);

    planton(home.path())
        .args(["load-manifest", "-f", &manifest, "--set", "spec.vpcCidr"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid override"));
}

#[test]
fn test_config_set_get_list() {
    let home = TempDir::new().unwrap();

    planton(home.path())
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No configuration values set"));

    planton(home.path())
        .args(["config", "set", "backend-url", "https://api.example.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration backend-url set to"));

    planton(home.path())
        .args(["config", "get", "backend-url"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://api.example.com"));

    planton(home.path())
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("backend-url=https://api.example.com"));

    assert!(home.path().join("config.yaml").exists());
}

#[test]
fn test_config_errors() {
    let home = TempDir::new().unwrap();

    planton(home.path())
        .args(["config", "get", "webapp-version"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not set"));

    planton(home.path())
        .args(["config", "set", "color", "blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown configuration key"));

    planton(home.path())
        .args(["config", "set", "backend-url", "api.example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("http://"));
}

#[test]
fn test_modules_info_without_staging() {
    let home = TempDir::new().unwrap();
    planton(home.path())
        .args(["modules", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Staging area"))
        .stdout(predicate::str::contains("not been created"));
}

#[test]
fn test_upgrade_help() {
    let home = TempDir::new().unwrap();
    planton(home.path())
        .args(["upgrade", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--check"))
        .stdout(predicate::str::contains("--force"));
}
