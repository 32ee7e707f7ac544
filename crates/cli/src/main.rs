//! wercker - container pipeline runner
//!
//! Builds and deploys projects by running their pipeline steps inside
//! ephemeral containers.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "wercker")]
#[command(about = "Wercker - run build and deploy pipelines in containers")]
#[command(version)]
struct Cli {
    /// Path to the pipeline configuration
    #[arg(long, global = true, default_value = "wercker.toml")]
    config: PathBuf,

    /// Environment file loaded before option resolution
    #[arg(long, global = true, default_value = ".env")]
    environment: PathBuf,

    /// Raise with stack traces on fatal errors
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a project
    #[command(visible_alias = "b")]
    Build(commands::run::RunArgs),
    /// Deploy a project
    #[command(visible_alias = "d")]
    Deploy(commands::run::RunArgs),
    /// Detect the project type and write a starter configuration
    Detect,
    /// Run and attach to a recently built image
    Inspect(commands::inspect::InspectArgs),
    /// Log in and store an access token
    Login,
    /// Pull an image from the configured registry
    Pull(commands::pull::PullArgs),
    /// Display version information
    Version {
        /// Output version information as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Host env seeds option resolution; a missing env file is fine
    let _ = dotenvy::from_path(&cli.environment);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let Cli {
        config,
        environment: _,
        debug,
        command,
    } = cli;

    let code = match command {
        Commands::Build(args) => {
            commands::run::handle(wercker_core::RunKind::Build, args, &config, debug).await
        }
        Commands::Deploy(args) => {
            commands::run::handle(wercker_core::RunKind::Deploy, args, &config, debug).await
        }
        Commands::Detect => commands::detect::handle().await,
        Commands::Inspect(args) => commands::inspect::handle(args).await,
        Commands::Login => commands::login::handle().await,
        Commands::Pull(args) => commands::pull::handle(args).await,
        Commands::Version { json } => commands::version::handle(json),
    };
    std::process::exit(code);
}
