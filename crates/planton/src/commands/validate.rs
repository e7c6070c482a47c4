use super::prepare_manifest;
use crate::manifest_source::ManifestArgs;
use colored::Colorize;

pub async fn handle(args: ManifestArgs) -> anyhow::Result<()> {
    let prepared = prepare_manifest(&args).await?;
    let manifest = &prepared.manifest;

    println!();
    println!("{}", "✓ Manifest is valid".green().bold());
    println!("  apiVersion: {}", manifest.api_version().unwrap_or_default().cyan());
    println!("  kind:       {}", manifest.kind().unwrap_or_default().cyan());
    println!("  name:       {}", manifest.name().unwrap_or_default().cyan());
    if let Some(provisioner) = planton_core::provisioner_from_manifest(manifest)? {
        println!("  provisioner: {}", provisioner.to_string().cyan());
    }
    Ok(())
}
