//! `ticks-fetch`: runs the fetch jobs described in a JSON configuration file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ticks::{BreezeProvider, RunConfig};
use tracing::info;

/// Fetch historical bars and write them as CSV tables.
#[derive(Parser, Debug)]
#[command(name = "ticks-fetch", version, about)]
struct Cli {
    /// Path to the JSON run configuration.
    config: PathBuf,

    /// Log level used when RUST_LOG is not set.
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    ticks::init_logging(&cli.log_level);

    let config = RunConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    let provider = match &config.base_url {
        Some(url) => BreezeProvider::new().with_base_url(url),
        None => BreezeProvider::new(),
    };
    info!(jobs = config.jobs.len(), provider = ?provider, "Starting run");

    let summary = ticks::run(provider, &config).await.context("run failed")?;
    info!(bars = summary.bars, files = summary.outputs.len(), "Run complete");

    Ok(())
}
