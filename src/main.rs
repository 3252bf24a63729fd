//! Geosync Worker - geolocation enrichment jobs for the CRM
//!
//! Downloads survey images and extracts GPS coordinates from their EXIF
//! data, or geocodes free-text addresses, then bulk-writes the coordinates
//! back to the CRM.

mod cli;
mod config;
mod crm;
mod jobs;
mod services;
mod types;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs directory - use LOGS_DIR env var or default to ./logs
    let logs_dir = std::env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string());
    std::fs::create_dir_all(&logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &logs_dir, "geosync.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Initialize logging - both stdout and file
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,geosync_worker=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer()) // stdout
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        ) // file
        .init();

    let args = cli::Cli::parse();

    let config = config::Config::from_env()?;
    info!("Configuration loaded");

    match args.command {
        cli::Command::SurveyImages => {
            jobs::survey_images::run(&config, &args.outdir, args.limit, args.pool_size).await?;
        }
        cli::Command::GeocodeAddresses => {
            jobs::geocode_addresses::run(&config, args.limit, args.pool_size).await?;
        }
    }

    Ok(())
}
