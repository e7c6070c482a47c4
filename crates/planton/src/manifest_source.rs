//! Where the target manifest comes from
//!
//! Sources are tried in a fixed order and the first one present wins:
//! `--stack-input`, `--manifest`, `--input-dir`, `--kustomize-dir` with
//! `--overlay`, `--clipboard`, then piped stdin.

use anyhow::Context;
use clap::Args;
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::process::Command;

const INPUT_DIR_TARGET: &str = "target.yaml";

/// Flags that select the manifest, shared by every manifest command
#[derive(Args, Debug, Clone, Default)]
pub struct ManifestArgs {
    /// Manifest path, http(s) URL, or `-` for stdin
    #[arg(short = 'f', long)]
    pub manifest: Option<String>,

    /// Stack input file; its `target` is used as the manifest
    #[arg(long)]
    pub stack_input: Option<PathBuf>,

    /// Directory containing target.yaml and provider config files
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Directory containing kustomize configuration
    #[arg(long)]
    pub kustomize_dir: Option<PathBuf>,

    /// Kustomize overlay to build (e.g. dev, staging, prod)
    #[arg(long)]
    pub overlay: Option<String>,

    /// Read the manifest from the clipboard
    #[arg(long)]
    pub clipboard: bool,

    /// Override manifest fields (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    StackInput(PathBuf),
    File(PathBuf),
    Url(String),
    Stdin,
    InputDir(PathBuf),
    Kustomize { dir: PathBuf, overlay: String },
    Clipboard,
    PipedStdin,
}

impl ManifestSource {
    pub fn describe(&self) -> String {
        match self {
            ManifestSource::StackInput(path) => format!("stack input {}", path.display()),
            ManifestSource::File(path) => path.display().to_string(),
            ManifestSource::Url(url) => url.clone(),
            ManifestSource::Stdin | ManifestSource::PipedStdin => "stdin".to_string(),
            ManifestSource::InputDir(dir) => dir.join(INPUT_DIR_TARGET).display().to_string(),
            ManifestSource::Kustomize { dir, overlay } => {
                format!("kustomize overlay '{overlay}' in {}", dir.display())
            }
            ManifestSource::Clipboard => "clipboard".to_string(),
        }
    }
}

impl ManifestArgs {
    /// Picks the manifest source; `stdin_piped` reports whether stdin is not a terminal
    pub fn source(&self, stdin_piped: bool) -> anyhow::Result<ManifestSource> {
        let kustomize = match (&self.kustomize_dir, &self.overlay) {
            (Some(dir), Some(overlay)) => Some(ManifestSource::Kustomize {
                dir: dir.clone(),
                overlay: overlay.clone(),
            }),
            (Some(_), None) => anyhow::bail!("--overlay is required when --kustomize-dir is set"),
            (None, Some(_)) => anyhow::bail!("--kustomize-dir is required when --overlay is set"),
            (None, None) => None,
        };

        if let Some(path) = &self.stack_input {
            return Ok(ManifestSource::StackInput(path.clone()));
        }

        if let Some(manifest) = self.manifest.as_deref().map(str::trim) {
            if manifest == "-" {
                return Ok(ManifestSource::Stdin);
            }
            if manifest.starts_with("http://") || manifest.starts_with("https://") {
                return Ok(ManifestSource::Url(manifest.to_string()));
            }
            if !manifest.is_empty() {
                return Ok(ManifestSource::File(PathBuf::from(manifest)));
            }
        }

        if let Some(dir) = &self.input_dir {
            return Ok(ManifestSource::InputDir(dir.clone()));
        }

        if let Some(kustomize) = kustomize {
            return Ok(kustomize);
        }

        if self.clipboard {
            return Ok(ManifestSource::Clipboard);
        }

        if stdin_piped {
            return Ok(ManifestSource::PipedStdin);
        }

        anyhow::bail!(
            "no manifest provided. Use one of:\n  \
             -f, --manifest <path|url|->   manifest file, URL or stdin\n  \
             --stack-input <file>          stack input containing a target manifest\n  \
             --input-dir <dir>             directory containing target.yaml\n  \
             --kustomize-dir <dir> --overlay <name>\n  \
             --clipboard                   manifest copied to the clipboard\n  \
             or pipe the manifest into stdin"
        )
    }
}

/// Manifest file on disk for the rest of the run
///
/// Temporary files written while resolving are removed on drop.
#[derive(Debug)]
pub struct ResolvedManifest {
    path: PathBuf,
    source: ManifestSource,
    _temp: Option<TempPath>,
}

impl ResolvedManifest {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &ManifestSource {
        &self.source
    }

    fn existing(path: PathBuf, source: ManifestSource) -> Self {
        Self {
            path,
            source,
            _temp: None,
        }
    }

    fn temporary(content: &str, source: ManifestSource) -> anyhow::Result<Self> {
        let temp = write_temp_manifest(content)?;
        Ok(Self {
            path: temp.to_path_buf(),
            source,
            _temp: Some(temp),
        })
    }
}

pub async fn resolve(args: &ManifestArgs) -> anyhow::Result<ResolvedManifest> {
    let source = args.source(!std::io::stdin().is_terminal())?;
    tracing::debug!(source = %source.describe(), "Resolving manifest");

    match &source {
        ManifestSource::StackInput(path) => {
            let target = planton_core::extract_target(path)
                .with_context(|| format!("failed to read stack input {}", path.display()))?;
            ResolvedManifest::temporary(&target.to_yaml_string()?, source.clone())
        }
        ManifestSource::File(path) => {
            if !path.is_file() {
                anyhow::bail!("manifest file not found: {}", path.display());
            }
            Ok(ResolvedManifest::existing(path.clone(), source.clone()))
        }
        ManifestSource::Url(url) => {
            let path = download_manifest(url).await?;
            Ok(ResolvedManifest::existing(path, source.clone()))
        }
        ManifestSource::Stdin | ManifestSource::PipedStdin => {
            let content = read_stdin()?;
            ResolvedManifest::temporary(&content, source.clone())
        }
        ManifestSource::InputDir(dir) => {
            let path = dir.join(INPUT_DIR_TARGET);
            if !path.is_file() {
                anyhow::bail!(
                    "{} not found in input directory {}",
                    INPUT_DIR_TARGET,
                    dir.display()
                );
            }
            Ok(ResolvedManifest::existing(path, source.clone()))
        }
        ManifestSource::Kustomize { dir, overlay } => {
            let content = kustomize_build(dir, overlay).await?;
            ResolvedManifest::temporary(&content, source.clone())
        }
        ManifestSource::Clipboard => {
            let content = read_clipboard().await?;
            ResolvedManifest::temporary(&content, source.clone())
        }
    }
}

fn write_temp_manifest(content: &str) -> anyhow::Result<TempPath> {
    let temp = tempfile::Builder::new()
        .prefix("manifest-")
        .suffix(".yaml")
        .tempfile()
        .context("failed to create temp manifest file")?
        .into_temp_path();
    std::fs::write(&temp, content)?;
    Ok(temp)
}

fn read_stdin() -> anyhow::Result<String> {
    let mut content = String::new();
    std::io::stdin()
        .read_to_string(&mut content)
        .context("failed to read manifest from stdin")?;
    if content.trim().is_empty() {
        anyhow::bail!("manifest read from stdin is empty");
    }
    Ok(content)
}

/// Downloads a manifest into the workspace downloads directory
async fn download_manifest(url: &str) -> anyhow::Result<PathBuf> {
    let response = reqwest::Client::new()
        .get(url)
        .header("User-Agent", "project-planton")
        .send()
        .await
        .with_context(|| format!("failed to download manifest from {url}"))?;

    if !response.status().is_success() {
        anyhow::bail!(
            "failed to download manifest from {url}: HTTP {}",
            response.status()
        );
    }

    let content = response.text().await?;
    let path = planton_config::manifest_download_dir()?.join(download_file_name(url));
    std::fs::write(&path, content)?;
    tracing::debug!(path = %path.display(), "Downloaded manifest");
    Ok(path)
}

/// Last URL path segment when it looks like a file name
pub fn download_file_name(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.rfind(|s| !s.is_empty()).map(str::to_string))
        })
        .filter(|name| name.contains('.'))
        .unwrap_or_else(|| "manifest.yaml".to_string())
}

async fn kustomize_build(dir: &Path, overlay: &str) -> anyhow::Result<String> {
    let overlay_dir = dir.join("overlays").join(overlay);
    if !overlay_dir.is_dir() {
        anyhow::bail!("kustomize overlay directory not found: {}", overlay_dir.display());
    }

    tracing::debug!("Running: kustomize build {}", overlay_dir.display());
    let output = Command::new("kustomize")
        .arg("build")
        .arg(&overlay_dir)
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => anyhow::anyhow!(
                "kustomize not found in PATH. Install it from https://kubectl.docs.kubernetes.io/installation/kustomize/"
            ),
            _ => anyhow::Error::new(e).context("failed to run kustomize"),
        })?;

    if !output.status.success() {
        anyhow::bail!(
            "kustomize build failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8(output.stdout)?)
}

/// Clipboard readers in order of preference for this platform
pub fn clipboard_commands(os: &str) -> Vec<(&'static str, Vec<&'static str>)> {
    match os {
        "macos" => vec![("pbpaste", vec![])],
        "windows" => vec![(
            "powershell",
            vec!["-NoProfile", "-Command", "Get-Clipboard"],
        )],
        _ => vec![
            ("wl-paste", vec!["--no-newline"]),
            ("xclip", vec!["-selection", "clipboard", "-o"]),
        ],
    }
}

async fn read_clipboard() -> anyhow::Result<String> {
    for (program, args) in clipboard_commands(std::env::consts::OS) {
        tracing::debug!("Running: {} {}", program, args.join(" "));
        match Command::new(program).args(&args).output().await {
            Ok(output) if output.status.success() => {
                let content = String::from_utf8(output.stdout)?;
                if content.trim().is_empty() {
                    anyhow::bail!("clipboard is empty");
                }
                return Ok(content);
            }
            Ok(output) => {
                tracing::debug!(
                    program,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "Clipboard reader failed"
                );
            }
            Err(e) => tracing::debug!(program, error = %e, "Clipboard reader unavailable"),
        }
    }
    anyhow::bail!("could not read the clipboard; no supported clipboard tool found")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ManifestArgs {
        ManifestArgs::default()
    }

    #[test]
    fn test_stack_input_wins() {
        let args = ManifestArgs {
            stack_input: Some("input.yaml".into()),
            manifest: Some("manifest.yaml".into()),
            clipboard: true,
            ..args()
        };
        assert_eq!(
            args.source(true).unwrap(),
            ManifestSource::StackInput("input.yaml".into())
        );
    }

    #[test]
    fn test_manifest_flag_variants() {
        let with = |value: &str| ManifestArgs {
            manifest: Some(value.to_string()),
            input_dir: Some("dir".into()),
            ..args()
        };

        assert_eq!(
            with("a.yaml").source(false).unwrap(),
            ManifestSource::File("a.yaml".into())
        );
        assert_eq!(with("-").source(false).unwrap(), ManifestSource::Stdin);
        assert_eq!(
            with("https://example.com/m.yaml").source(false).unwrap(),
            ManifestSource::Url("https://example.com/m.yaml".into())
        );
        // blank value falls through to the next source
        assert_eq!(
            with("  ").source(false).unwrap(),
            ManifestSource::InputDir("dir".into())
        );
    }

    #[test]
    fn test_kustomize_requires_both_flags() {
        let only_dir = ManifestArgs {
            kustomize_dir: Some("_kustomize".into()),
            ..args()
        };
        assert!(only_dir.source(false).unwrap_err().to_string().contains("--overlay"));

        let only_overlay = ManifestArgs {
            overlay: Some("prod".into()),
            ..args()
        };
        assert!(
            only_overlay
                .source(false)
                .unwrap_err()
                .to_string()
                .contains("--kustomize-dir")
        );

        let both = ManifestArgs {
            kustomize_dir: Some("_kustomize".into()),
            overlay: Some("prod".into()),
            clipboard: true,
            ..args()
        };
        assert_eq!(
            both.source(false).unwrap(),
            ManifestSource::Kustomize {
                dir: "_kustomize".into(),
                overlay: "prod".into()
            }
        );
    }

    #[test]
    fn test_clipboard_then_piped_stdin() {
        let clipboard = ManifestArgs {
            clipboard: true,
            ..args()
        };
        assert_eq!(clipboard.source(true).unwrap(), ManifestSource::Clipboard);
        assert_eq!(args().source(true).unwrap(), ManifestSource::PipedStdin);
    }

    #[test]
    fn test_no_source_lists_options() {
        let message = args().source(false).unwrap_err().to_string();
        assert!(message.contains("no manifest provided"));
        assert!(message.contains("--stack-input"));
        assert!(message.contains("--kustomize-dir"));
        assert!(message.contains("--clipboard"));
    }

    #[test]
    fn test_download_file_name() {
        assert_eq!(
            download_file_name("https://example.com/manifests/redis.yaml?ref=main"),
            "redis.yaml"
        );
        assert_eq!(download_file_name("https://example.com/"), "manifest.yaml");
        assert_eq!(download_file_name("https://example.com/raw"), "manifest.yaml");
    }

    #[test]
    fn test_clipboard_commands_per_platform() {
        assert_eq!(clipboard_commands("macos")[0].0, "pbpaste");
        assert_eq!(clipboard_commands("windows")[0].0, "powershell");
        let linux: Vec<_> = clipboard_commands("linux").into_iter().map(|c| c.0).collect();
        assert_eq!(linux, ["wl-paste", "xclip"]);
    }

    #[tokio::test]
    async fn test_resolve_stack_input_writes_temp_target() {
        let temp_dir = tempfile::tempdir().unwrap();
        let stack_input = temp_dir.path().join("stack-input.yaml");
        std::fs::write(
            &stack_input,
            "target:\n  apiVersion: aws.project-planton.org/v1\n  kind: AwsS3Bucket\n  metadata:\n    name: logs\n  spec: {}\n",
        )
        .unwrap();

        let args = ManifestArgs {
            stack_input: Some(stack_input),
            ..args()
        };
        let resolved = resolve(&args).await.unwrap();
        let temp_path = resolved.path().to_path_buf();

        let manifest = planton_core::Manifest::load(&temp_path).unwrap();
        assert_eq!(manifest.kind(), Some("AwsS3Bucket"));
        assert_eq!(manifest.name(), Some("logs"));

        drop(resolved);
        assert!(!temp_path.exists());
    }

    #[tokio::test]
    async fn test_resolve_input_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let args = ManifestArgs {
            input_dir: Some(temp_dir.path().to_path_buf()),
            ..args()
        };
        assert!(resolve(&args).await.is_err());

        std::fs::write(temp_dir.path().join("target.yaml"), "kind: AwsS3Bucket\n").unwrap();
        let resolved = resolve(&args).await.unwrap();
        assert_eq!(resolved.path(), temp_dir.path().join("target.yaml"));
        assert!(matches!(resolved.source(), ManifestSource::InputDir(_)));
    }
}
