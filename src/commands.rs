//! CLI command definitions
//!
//! Defines the clap commands for the harness CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run a YAML test suite against the simulator
    Run {
        /// Path to the YAML suite file
        suite: PathBuf,

        /// Output the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve breakpoint labels to addresses without starting the debugger
    Resolve {
        /// Assembler listing containing the labels
        #[arg(long)]
        listing: PathBuf,

        /// Map file from the same build
        #[arg(long)]
        map: PathBuf,

        /// Labels to resolve
        #[arg(required = true)]
        names: Vec<String>,

        /// Output the table as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start a debugger session, send a script of raw commands, and shut down
    Exec {
        /// File with one debugger command per line
        #[arg(long)]
        script: PathBuf,
    },
}
