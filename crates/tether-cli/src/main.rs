//! Tether command-line demo
//!
//! Runs binding scenarios against the in-process heap and prints the
//! effective configuration.

mod commands;
mod config;
mod kinds;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Native handle binding demos", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./tether.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Move values to a fresh handle on every write
    #[arg(long, global = true)]
    relocate: bool,

    /// Log debug output regardless of RUST_LOG
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set and read fields on a root and a nested struct
    Hello,

    /// Show that a nested proxy read earlier goes stale
    Snapshot,

    /// Print the effective configuration
    Config {
        /// Output format
        #[arg(short, long, value_enum, default_value = "toml")]
        format: commands::config::Format,
    },
}

fn init_logging(verbose: bool) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = config::TetherConfig::load(cli.config.as_deref())?;
    if cli.relocate {
        config.heap.relocate_on_write = true;
    }

    match cli.command {
        Commands::Hello => commands::hello::execute(&config),
        Commands::Snapshot => commands::snapshot::execute(&config),
        Commands::Config { format } => commands::config::execute(&config, format),
    }
}
