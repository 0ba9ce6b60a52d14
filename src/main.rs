//! Montage CLI - Timeline Composition Engine
//!
//! Command-line interface for inspecting and editing composition files.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use montage::cli::{commands, Cli, Commands};
use montage::EngineConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Montage v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Some(cmd) => handle_command(cmd, &config).await,
        None => {
            println!("Montage v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

async fn handle_command(cmd: Commands, config: &EngineConfig) -> anyhow::Result<()> {
    match cmd {
        Commands::Init { path, force } => commands::init(&path, force)?,
        Commands::PrintState { path } => commands::print_state(&path)?,
        Commands::Stack { path, layer, lane } => commands::stack(&path, layer, lane)?,
        Commands::Snap {
            path,
            time,
            playhead,
        } => commands::snap(&path, config, time, playhead)?,
        Commands::Check { path, fix } => commands::check(&path, fix)?,
        Commands::Export {
            path,
            episode,
            output,
        } => commands::export(&path, &episode, output.as_deref())?,
        Commands::AddLayer { path, name } => commands::add_layer(&path, config, name.as_deref())?,
        Commands::Timing {
            path,
            clip,
            start,
            duration,
        } => commands::timing(&path, config, clip, start, duration).await?,
        Commands::Split { path, clip, at } => commands::split(&path, config, clip, at).await?,
    }
    Ok(())
}
