//! Seltra rebalancing service - Entry Point
//!
//! Observation mode: emit decisions only.
//! Apply mode: execute triggered decisions against the tracked pool ranges.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use seltra_service::{AppConfig, Application, MonotonicClock};
use tokio::io::BufReader;
use tracing::info;

/// Volatility-adaptive liquidity rebalancing service
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via SELTRA_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// JSON-lines tick file; reads stdin when omitted
    #[arg(short, long)]
    ticks: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Determine config path: CLI arg > SELTRA_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("SELTRA_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    let config = AppConfig::from_file(&config_path)?;

    seltra_telemetry::init_logging(config.telemetry.log_filter.as_deref())?;
    info!("Starting Seltra v{}", env!("CARGO_PKG_VERSION"));
    info!(config_path = %config_path, mode = ?config.mode, pools = config.pools.len(), "Configuration loaded");

    let metrics_path = config.telemetry.metrics_path.clone();
    let app = Application::new(config, Arc::new(MonotonicClock::new()))?;

    let stdout = tokio::io::stdout();
    let summary = match args.ticks {
        Some(path) => {
            info!(path = %path.display(), "Reading ticks from file");
            let file = tokio::fs::File::open(&path).await?;
            app.run(BufReader::new(file), stdout).await?
        }
        None => {
            info!("Reading ticks from stdin");
            app.run(BufReader::new(tokio::io::stdin()), stdout).await?
        }
    };

    if let Some(path) = metrics_path {
        tokio::fs::write(&path, seltra_telemetry::Metrics::render()?).await?;
        info!(path = %path, "Metrics written");
    }

    info!(?summary, "Done");
    Ok(())
}
