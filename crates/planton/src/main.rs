mod commands;
mod manifest_source;
mod prompt;
mod upgrade;
mod utils;

use clap::{Parser, Subcommand};
use commands::provision::ProvisionArgs;
use manifest_source::ManifestArgs;
use planton_iac::Operation;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "project-planton")]
#[command(about = "Deploy open-source cloud resources from Kubernetes-style manifests", long_about = None)]
#[command(version = upgrade::version::current())]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the backend or stack for a manifest
    Init(ProvisionArgs),
    /// Preview infrastructure changes
    #[command(visible_alias = "preview")]
    Plan(ProvisionArgs),
    /// Apply infrastructure changes
    #[command(visible_alias = "update")]
    Apply(ProvisionArgs),
    /// Reconcile state with the real infrastructure
    Refresh(ProvisionArgs),
    /// Destroy the infrastructure described by a manifest
    #[command(visible_alias = "delete")]
    Destroy(ProvisionArgs),
    /// Validate a manifest
    Validate(ManifestArgs),
    /// Print the manifest with overrides applied
    #[command(name = "load-manifest")]
    LoadManifest(ManifestArgs),
    /// Manage the local copy of the IaC modules
    #[command(subcommand)]
    Modules(ModulesCommands),
    /// Upgrade project-planton to the latest or a specific release
    Upgrade {
        /// Only check whether a newer release exists
        #[arg(short, long)]
        check: bool,
        /// Reinstall even when already up to date
        #[arg(short, long)]
        force: bool,
        /// Release to install (e.g. v0.3.15-cli.20260113.0)
        version: Option<String>,
    },
    /// Show version information
    Version,
    /// Manage project-planton settings
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ModulesCommands {
    /// Fetch the latest modules into the staging area
    Pull,
    /// Switch the staging area to a tag, branch or commit ("latest" for the newest tag)
    Checkout {
        /// Version to check out
        version: String,
    },
    /// Show the staging area location and version
    Info,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set a configuration value
    Set {
        /// Key (backend-url, webapp-container-id, webapp-version)
        key: String,
        value: String,
    },
    /// Print a configuration value
    Get {
        /// Key (backend-url, webapp-container-id, webapp-version)
        key: String,
    },
    /// List all configuration values
    List,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Init(args) => commands::provision::handle(Operation::Init, args).await?,
        Commands::Plan(args) => commands::provision::handle(Operation::Preview, args).await?,
        Commands::Apply(args) => commands::provision::handle(Operation::Update, args).await?,
        Commands::Refresh(args) => commands::provision::handle(Operation::Refresh, args).await?,
        Commands::Destroy(args) => commands::provision::handle(Operation::Destroy, args).await?,
        Commands::Validate(args) => commands::validate::handle(args).await?,
        Commands::LoadManifest(args) => commands::load_manifest::handle(args).await?,
        Commands::Modules(cmd) => match cmd {
            ModulesCommands::Pull => commands::modules::handle_pull().await?,
            ModulesCommands::Checkout { version } => {
                commands::modules::handle_checkout(&version).await?
            }
            ModulesCommands::Info => commands::modules::handle_info().await?,
        },
        Commands::Upgrade {
            check,
            force,
            version,
        } => upgrade::run(check, force, version.as_deref()).await?,
        Commands::Version => commands::version::handle(),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Set { key, value } => commands::config::handle_set(&key, &value)?,
            ConfigCommands::Get { key } => commands::config::handle_get(&key)?,
            ConfigCommands::List => commands::config::handle_list()?,
        },
    }

    Ok(())
}
