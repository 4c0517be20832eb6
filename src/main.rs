//! mdb-harness - firmware tests driven through the MPLAB debugger
//!
//! Runs YAML test suites against the simulator by scripting the debugger's
//! command line interface over its standard streams.

use std::path::PathBuf;

use clap::Parser;
use commands::Commands;
use mdb_harness::common::{config::Config, logging};
use mdb_harness::{cli, commands};

#[derive(Parser)]
#[command(name = "mdb-harness", about = "Firmware test harness for the MPLAB debugger")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write a full debugger transcript to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let _guard = match &cli.log_file {
        Some(path) => match logging::init_with_file(path) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("Error: cannot open log file '{}': {e}", path.display());
                std::process::exit(2);
            }
        },
        None => {
            logging::init_cli();
            None
        }
    };

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    let result = match config {
        Ok(config) => cli::dispatch(cli.command, &config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error [{}]: {e}", e.code());
            std::process::exit(2);
        }
    }
}
