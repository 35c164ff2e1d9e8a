//! UniCloud CLI - Main entry point

mod console;
mod serve;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use unicloud_foundation::{default_data_dir, HostingConfig};
use unicloud_hosting::{HostingInfo, Registry};

/// UniCloud - host user applications as supervised processes
#[derive(Parser, Debug)]
#[command(name = "unicloud")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Directory holding config.json, the registry and the workspaces
    #[arg(long, env = "UNICLOUD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Relaunch running applications and accept console commands (default)
    Serve,
    /// Print the registry without starting anything
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let data_dir = args.data_dir.unwrap_or_else(default_data_dir);
    std::fs::create_dir_all(&data_dir)?;
    let config = HostingConfig::load(&data_dir)?;
    tracing::debug!(data_dir = %data_dir.display(), "Configuration loaded");

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve::run(&data_dir, config).await,
        Command::List => list_cmd(&data_dir, &config),
    }
}

fn list_cmd(data_dir: &std::path::Path, config: &HostingConfig) -> anyhow::Result<()> {
    let records = Registry::new(data_dir, config.registry_file.clone()).load()?;
    if records.is_empty() {
        println!("No hosted applications.");
        return Ok(());
    }

    let infos: Vec<HostingInfo> = records
        .into_iter()
        .map(|(identity, record)| HostingInfo {
            identity,
            record,
            live: false,
            pid: None,
        })
        .collect();
    serve::print_table(&infos);
    Ok(())
}
