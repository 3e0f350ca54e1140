mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "psf", about = "Axial point spread function analyzer")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show SER file metadata
    Info(commands::info::InfoArgs),
    /// Fit the PSF of a single recorded frame
    Fit(commands::fit::FitArgs),
    /// Feed a recording through the live analyzer
    Replay(commands::replay::ReplayArgs),
    /// Write a synthetic PSF recording
    Simulate(commands::simulate::SimulateArgs),
    /// Print default analysis parameters as TOML
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Fit(args) => commands::fit::run(args),
        Commands::Replay(args) => commands::replay::run(args, cli.verbose),
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
