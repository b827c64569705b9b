mod analysis;
mod config;
mod engine;
mod groups;
mod manager;
mod shelf;
mod shopper;
mod stats;
mod types;

use crate::manager::Manager;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    /// Directory holding `config.toml` and the generated tables.
    #[arg(long)]
    sim_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Simulate shelves and choices and write the resulting tables.
    Simulate {
        /// Override the seed given in the configuration.
        #[arg(long)]
        seed: Option<u64>,

        /// Skip the summary reports.
        #[arg(long)]
        no_report: bool,
    },

    /// Remove every generated table.
    Clean,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mgr = Manager::new(args.sim_dir).context("failed to construct mgr")?;

    match args.command {
        Command::Simulate { seed, no_report } => mgr.simulate(seed, !no_report)?,
        Command::Clean => mgr.clean()?,
    }

    Ok(())
}
