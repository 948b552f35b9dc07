//! Command-line interface.

use clap::{Parser, Subcommand};

/// PAIRBOT - adaptive single-pair crypto trading loop
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Set the run flag and run the trading loop in the foreground
    Start,
    /// Clear the run flag; a running loop exits after its current cycle
    Stop,
    /// Show whether the run flag is set
    Status,
    /// Print the log file
    Monitor {
        /// Keep printing new log lines as they arrive
        #[arg(short, long, default_value_t = false)]
        follow: bool,
    },
    /// Truncate the log file
    ClearLog,
}
