//! navicue-review - read-only NaviCue catalog inspection tool
//!
//! Prints facet indexes, query pages and statistics as JSON on stdout.
//! Logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use navicue_core::config::load_resolved;
use navicue_review::{log_config_source, log_level, run, Catalog, Cli};
use tracing::info;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, source) =
        load_resolved(cli.config.as_deref()).context("Failed to load catalog config")?;

    let level = log_level(cli.log_level.as_deref(), &config)?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    info!("Starting NaviCue review v{}", env!("CARGO_PKG_VERSION"));
    log_config_source(&source);

    let catalog = Catalog::open(&cli.taxonomy, &cli.records, &config)?;
    let output = run(&cli.command, &catalog)?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
