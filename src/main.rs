use anyhow::{bail, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;

use psx_scraper::cli::{Cli, Commands};
use psx_scraper::config::ServerConfig;
use psx_scraper::models::ScrapeResponse;
use psx_scraper::scraping::ChromeLauncher;
use psx_scraper::server::{self, error_payload, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.options.into_config()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => server::serve(config).await,
        Commands::Scrape => scrape_once(config).await,
    }
}

/// Run the pipeline once and print the JSON payload on stdout
async fn scrape_once(config: ServerConfig) -> Result<()> {
    let launcher = Arc::new(ChromeLauncher::new(config.chrome_path.clone()));
    let state = AppState::from_config(&config, launcher)?;

    match state.pipeline().run().await {
        Ok(report) => {
            let response = ScrapeResponse::from(report);
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(e) => {
            error!("Scraping error: {}", e);
            let payload = error_payload(&e, config.environment);
            println!("{}", serde_json::to_string_pretty(&payload)?);
            bail!("scrape failed")
        }
    }
}
