mod cli;
mod run;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use keycheck_core::AppConfig;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let mut config: AppConfig = toml::from_str(&config_str)?;

    // Environment overrides for pacing, handy when re-running under pressure
    if let Ok(v) = std::env::var("KEYCHECK_MIN_DELAY") {
        if let Ok(n) = v.parse::<f64>() {
            config.pacing.min_delay_secs = n;
        }
    }
    if let Ok(v) = std::env::var("KEYCHECK_MAX_DELAY") {
        if let Ok(n) = v.parse::<f64>() {
            config.pacing.max_delay_secs = n;
        }
    }

    match cli.command {
        Commands::Check {
            input,
            output,
            timestamp,
            skip_second_column,
        } => {
            if skip_second_column {
                config.columns.check_second_column = false;
            }
            run::run_check(config, &input, output, timestamp).await?;
        }
        Commands::Plan { input } => {
            run::run_plan(config, &input)?;
        }
    }

    Ok(())
}
