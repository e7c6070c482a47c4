//! Print the effective manifest as YAML
//!
//! Output goes to stdout untouched so it can be piped into other tools.

use crate::manifest_source::{self, ManifestArgs};
use planton_core::Manifest;

pub async fn handle(args: ManifestArgs) -> anyhow::Result<()> {
    let resolved = manifest_source::resolve(&args).await?;
    let mut manifest = Manifest::load(resolved.path())?;

    let overrides = planton_core::parse_overrides(&args.overrides)?;
    planton_core::apply_overrides(&mut manifest, &overrides)?;

    print!("{}", manifest.to_yaml_string()?);
    Ok(())
}
