//! `project-planton upgrade`: self-update from GitHub releases

pub mod direct;
pub mod homebrew;
pub mod platform;
pub mod version;

use crate::prompt;
use crate::utils::{print_error, print_info, print_step, print_success, print_warning};
use colored::Colorize;
use homebrew::InstallMethod;
use std::path::PathBuf;
use thiserror::Error;
use version::{GitHubReleases, RELEASES_PAGE_URL};

#[derive(Error, Debug)]
pub enum UpgradeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("no CLI releases found")]
    NoReleases,

    #[error("version {0} not found")]
    VersionNotFound(String),

    #[error("unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("checksum not found for {0}")]
    ChecksumNotFound(String),

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("{0} not found in release archive")]
    BinaryNotInArchive(String),

    #[error("permission denied writing {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Upgrade to the latest release, or install `target` when given
pub async fn run(check_only: bool, force: bool, target: Option<&str>) -> anyhow::Result<()> {
    let current = version::current();
    match target.map(str::trim).filter(|t| !t.is_empty()) {
        Some(target) => upgrade_to_version(current, target, force).await?,
        None => upgrade_to_latest(current, check_only, force).await?,
    }
    Ok(())
}

/// Prints recovery instructions for a failed install step
fn report<T>(result: Result<T, UpgradeError>) -> Result<T, UpgradeError> {
    if let Err(e) = &result {
        print_failure_help(e);
    }
    result
}

async fn upgrade_to_latest(current: &str, check_only: bool, force: bool) -> Result<(), UpgradeError> {
    print_step("Checking for updates...");
    let releases = GitHubReleases::new()?;
    let latest = match releases.latest().await {
        Ok(latest) => latest,
        Err(e) => {
            print_error(&format!("Failed to check for updates: {e}"));
            println!();
            println!("You can manually download the latest version from:");
            println!("  {RELEASES_PAGE_URL}");
            return Err(e);
        }
    };

    let needs_upgrade = version::is_newer(current, &latest);
    println!();
    if needs_upgrade {
        println!("Current version: {}", current.yellow());
    } else {
        println!("Current version: {}", current.green().bold());
    }
    println!("Latest version:  {}", latest.green().bold());

    if !needs_upgrade && !force {
        println!();
        print_success(&format!("project-planton is already up to date ({current})"));
        return Ok(());
    }

    if check_only {
        if needs_upgrade {
            println!();
            println!("{} A new version is available!", "⚡".yellow().bold());
            println!();
            println!("Run {} to update.", "project-planton upgrade".cyan().bold());
        }
        return Ok(());
    }

    if force && !needs_upgrade {
        println!();
        print_info("Forcing upgrade...");
    }

    let method = homebrew::detect();
    println!();
    print_info(&format!("Upgrade method: {method}"));

    match method {
        InstallMethod::Homebrew => {
            print_step("Upgrading via Homebrew...");
            report(homebrew::upgrade().await)?;
            println!();
            print_success(&format!("Successfully upgraded to {latest}"));
        }
        InstallMethod::Direct => {
            let installed = report(direct::install(&latest).await)?;
            print_installed(&installed);
            println!();
            print_success(&format!("Successfully upgraded to {latest}"));
            println!();
            println!(
                "{}",
                "Restart your terminal or run 'hash -r' to use the new version.".dimmed()
            );
        }
    }
    Ok(())
}

async fn upgrade_to_version(current: &str, target: &str, force: bool) -> Result<(), UpgradeError> {
    print_step(&format!("Validating version {target}..."));
    let releases = GitHubReleases::new()?;
    let tag = match releases.validate_version(target).await {
        Ok(tag) => tag,
        Err(e) => {
            print_error(&format!("Failed to validate version: {e}"));
            println!();
            println!("Available releases:");
            println!("  {RELEASES_PAGE_URL}");
            return Err(e);
        }
    };

    println!();
    println!("Current version: {}", current.yellow());
    println!("Target version:  {}", tag.green().bold());

    if current == tag && !force {
        println!();
        print_success(&format!("project-planton is already at version {tag}"));
        return Ok(());
    }

    if homebrew::detect() == InstallMethod::Homebrew {
        println!();
        print_warning("project-planton is installed via Homebrew");
        println!("Homebrew only installs the latest release. To install {tag}:");
        println!("  1. project-planton is uninstalled from Homebrew");
        println!("  2. {tag} is downloaded directly from GitHub releases");
        println!();
        println!("To return to Homebrew later: brew install --cask project-planton");
        println!();

        let proceed = prompt::confirm("Proceed?")?;
        if !proceed {
            println!("Aborted. No changes made.");
            return Ok(());
        }

        print_step("Uninstalling Homebrew cask...");
        report(homebrew::uninstall().await)?;
        print_success("Removed Homebrew installation");
    }

    let installed = report(direct::install(&tag).await)?;
    print_installed(&installed);
    println!();
    print_success(&format!("Successfully installed {tag}"));
    Ok(())
}

fn print_installed(installed: &direct::Installed) {
    tracing::info!(path = %installed.path.display(), "Installed project-planton");
    if let Some(hint) = &installed.path_hint {
        println!();
        print_warning(hint);
    }
}

fn print_failure_help(error: &UpgradeError) {
    println!();
    match error {
        UpgradeError::PermissionDenied { path } => {
            print_error(&format!("Permission denied writing {}", path.display()));
            println!();
            println!("Try running with sudo:");
            println!("  sudo project-planton upgrade");
            println!();
            println!("Or install manually:");
            print_manual_steps();
        }
        other => {
            print_error(&format!("Upgrade failed: {other}"));
            println!();
            println!("You can download the release manually from:");
            println!("  {RELEASES_PAGE_URL}");
            println!();
            print_manual_steps();
        }
    }
}

fn print_manual_steps() {
    let Ok(platform) = platform::Platform::current() else {
        return;
    };
    let archive = platform.asset_name("<version>");
    println!("  1. Download {archive} from the release page");
    println!("  2. tar -xzf {archive}");
    if platform.os == "darwin" {
        println!("  3. xattr -d com.apple.quarantine project-planton");
        println!("  4. chmod +x project-planton && sudo mv project-planton /usr/local/bin/");
    } else {
        println!("  3. chmod +x project-planton && sudo mv project-planton /usr/local/bin/");
    }
}
