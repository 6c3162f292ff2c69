//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Operator CLI for asset health analysis and timeline playback."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use r_ems_common::{init_tracing, AppConfig};
use tracing::debug;

mod analyze;
mod playback;

const CONFIG_CANDIDATES: [&str; 2] = ["r-ems-twin.toml", "config/r-ems-twin.toml"];

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "R-EMS asset twin analytics and playback utility",
    long_about = None
)]
struct Cli {
    #[arg(
        long,
        value_name = "FILE",
        global = true,
        help = "Path to configuration file"
    )]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Analyze simulation records and print health summaries as JSON")]
    Analyze(analyze::AnalyzeCommand),
    #[command(about = "Classify a single parameter reading against the threshold catalog")]
    Evaluate(analyze::EvaluateCommand),
    #[command(about = "Play a record's timeline and stream events as JSON Lines")]
    Playback(playback::PlaybackCommand),
}

fn load_config(explicit: Option<&PathBuf>) -> Result<AppConfig> {
    match explicit {
        Some(path) => AppConfig::from_path(path),
        None => AppConfig::load_or_default(&CONFIG_CANDIDATES),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    init_tracing(env!("CARGO_PKG_NAME"), &config.logging)?;
    debug!(command = ?cli.command, "starting");

    match cli.command {
        Commands::Analyze(cmd) => cmd.execute(&config)?,
        Commands::Evaluate(cmd) => cmd.execute(&config)?,
        Commands::Playback(cmd) => cmd.execute(&config).await?,
    }
    Ok(())
}
