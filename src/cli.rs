use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "keycheck",
    about = "Batch activation-key status checker driven through a real browser"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check all pending keys against the portal
    Check {
        /// Input CSV with at least one key column
        input: PathBuf,

        /// Output path (default: input name with a _with_status suffix)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Timestamp the derived output filename
        #[arg(long)]
        timestamp: bool,

        /// Ignore the second key column even when configured
        #[arg(long)]
        skip_second_column: bool,
    },
    /// Build and show the work queue without opening a browser
    Plan {
        /// Input CSV with at least one key column
        input: PathBuf,
    },
}
