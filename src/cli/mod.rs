//! Command-line interface for nexus-match.

use std::path::PathBuf;

use clap::Parser;

pub mod commands;
pub mod output;

pub use commands::Commands;

/// Score and rank international teachers against school job postings.
#[derive(Parser, Debug)]
#[command(name = "nexus-match", version, about, long_about = None)]
pub struct Cli {
    /// Config file (skips the global and project files)
    #[arg(long, global = true, env = "NEXUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Machine-readable JSON output on stdout
    #[arg(long, global = true, env = "NEXUS_ROBOT")]
    pub robot: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all logs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}
