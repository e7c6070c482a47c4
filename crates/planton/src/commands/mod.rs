pub mod config;
pub mod load_manifest;
pub mod modules;
pub mod provision;
pub mod validate;
pub mod version;

use crate::manifest_source::{self, ManifestArgs, ResolvedManifest};
use crate::utils::{print_step, print_success};
use anyhow::Context;
use planton_core::{Manifest, OverriddenManifest};

/// Manifest after resolution, overrides and validation
///
/// Holds the temp files it was read from until the run is over.
pub struct PreparedManifest {
    pub manifest: Manifest,
    _resolved: ResolvedManifest,
    _overridden: OverriddenManifest,
}

/// Resolve the manifest, apply `--set` overrides, then validate
pub async fn prepare_manifest(args: &ManifestArgs) -> anyhow::Result<PreparedManifest> {
    match (&args.kustomize_dir, &args.overlay) {
        (Some(_), Some(overlay)) => {
            print_step(&format!("Building manifest from kustomize overlay: {overlay}"))
        }
        _ => print_step("Loading manifest..."),
    }
    let resolved = manifest_source::resolve(args)
        .await
        .context("failed to resolve manifest")?;
    print_success(&format!("Manifest loaded from {}", resolved.source().describe()));

    let overrides = planton_core::parse_overrides(&args.overrides)?;
    if !overrides.is_empty() {
        print_step(&format!("Applying {} field override(s)...", overrides.len()));
    }
    let overridden = planton_core::apply_overrides_to_file(resolved.path(), &overrides)?;
    if !overrides.is_empty() {
        print_success("Overrides applied");
    }

    print_step("Validating manifest...");
    let manifest = Manifest::load(overridden.path())?;
    planton_core::validate(&manifest)?;
    print_success("Manifest validated");

    Ok(PreparedManifest {
        manifest,
        _resolved: resolved,
        _overridden: overridden,
    })
}
