//! CLI argument parsing for the geosync-worker binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::services::dispatcher::DEFAULT_POOL_SIZE;

#[derive(Parser)]
#[command(name = "geosync-worker", about = "Geolocation enrichment jobs for the CRM")]
pub struct Cli {
    /// Output directory for downloaded images
    #[arg(short = 'o', long = "output-dir", default_value = "/tmp/surveyImages/")]
    pub outdir: PathBuf,

    /// Max number of records to update per invocation (0 = no limit)
    #[arg(short = 'l', long, default_value_t = 0)]
    pub limit: usize,

    /// Pool size -- max number of requests to send simultaneously
    #[arg(short = 'p', long = "pool_size", default_value_t = DEFAULT_POOL_SIZE)]
    pub pool_size: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Download survey images and extract GPS coordinates from their EXIF data
    SurveyImages,
    /// Geocode free-text residency addresses
    GeocodeAddresses,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_survey_images_parses() {
        let cli = Cli::parse_from(["geosync-worker", "survey-images"]);
        assert!(matches!(cli.command, Command::SurveyImages));
        assert_eq!(cli.pool_size, 25);
        assert_eq!(cli.limit, 0);
    }

    #[test]
    fn test_cli_geocode_addresses_parses() {
        let cli = Cli::parse_from(["geosync-worker", "geocode-addresses"]);
        assert!(matches!(cli.command, Command::GeocodeAddresses));
    }

    #[test]
    fn test_cli_flags_override_defaults() {
        let cli = Cli::parse_from([
            "geosync-worker",
            "--output-dir",
            "/tmp/elsewhere",
            "--limit",
            "100",
            "--pool_size",
            "10",
            "survey-images",
        ]);
        assert_eq!(cli.outdir, PathBuf::from("/tmp/elsewhere"));
        assert_eq!(cli.limit, 100);
        assert_eq!(cli.pool_size, 10);
    }

    #[test]
    fn test_cli_requires_a_subcommand() {
        assert!(Cli::try_parse_from(["geosync-worker"]).is_err());
    }
}
