//! `modules pull|checkout|info`: the staging mirror of the modules repository

use crate::utils::{print_info, print_step, print_success};
use colored::Colorize;
use planton_staging::StagingArea;

pub async fn handle_pull() -> anyhow::Result<()> {
    let staging = StagingArea::from_workspace()?;
    print_step(&format!("Updating staging area from {}...", staging.clone_url()));
    let version = staging.pull().await?;
    print_success(&format!("Staging area at {}", version.cyan()));
    Ok(())
}

pub async fn handle_checkout(version: &str) -> anyhow::Result<()> {
    let staging = StagingArea::from_workspace()?;
    print_step(&format!("Checking out {version} in staging area..."));
    let checked_out = staging.checkout(version).await?;
    print_success(&format!("Staging area switched to {}", checked_out.cyan()));
    Ok(())
}

pub async fn handle_info() -> anyhow::Result<()> {
    let staging = StagingArea::from_workspace()?;
    let info = staging.info()?;

    println!("{}", "Staging area".blue().bold());
    println!("  Location: {}", info.repo_path.display().to_string().cyan());
    println!("  Source:   {}", staging.clone_url());

    if !info.exists {
        println!();
        print_info("Staging area has not been created yet");
        println!("  Run {} to clone the modules repository.", "project-planton modules pull".cyan());
        return Ok(());
    }

    let version = if info.version.is_empty() {
        staging.head().await?
    } else {
        info.version
    };
    println!("  Version:  {}", version.green());
    Ok(())
}
