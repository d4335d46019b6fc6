use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::config::{Environment, ServerConfig};
use crate::pipeline::EnrichmentPolicy;
use crate::sources::{find_profile, profile_keys};

#[derive(Parser)]
#[command(name = "psx-scraper")]
#[command(version, about = "KSE-100 price scraper service for the Pakistan Stock Exchange")]
#[command(
    long_about = "Launches headless Chrome against dps.psx.com.pk (or a mirror), reads the market table and serves it as JSON with company names joined in."
)]
pub struct Cli {
    #[command(flatten)]
    pub options: ServiceOptions,

    /// Defaults to `serve`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP service
    Serve,

    /// Scrape once and print the result as JSON
    Scrape,
}

#[derive(Args, Debug, Clone)]
pub struct ServiceOptions {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3001, global = true)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0", global = true)]
    pub host: IpAddr,

    /// Deployment environment; `development` adds diagnostics to error responses.
    /// Falls back to `NODE_ENV`, then `production`
    #[arg(long, env = "APP_ENV", global = true)]
    pub environment: Option<String>,

    /// Source profile to scrape
    #[arg(long, env = "SCRAPER_SOURCE", default_value = "psx-market-watch", global = true)]
    pub source: String,

    /// Override the profile's page URL (mirror sites)
    #[arg(long, env = "SCRAPER_SOURCE_URL", global = true)]
    pub source_url: Option<String>,

    /// Override the symbol name feed URL
    #[arg(long, env = "SCRAPER_NAMES_URL", global = true)]
    pub names_url: Option<String>,

    /// Maximum number of browsers running at once
    #[arg(long, env = "SCRAPER_MAX_BROWSERS", default_value_t = 2, global = true)]
    pub max_browsers: usize,

    /// Chrome/Chromium executable (auto-detected when omitted)
    #[arg(long, env = "CHROME_PATH", global = true)]
    pub chrome_path: Option<PathBuf>,

    /// What a symbol feed outage does to the request
    #[arg(long, env = "SCRAPER_ENRICHMENT", value_enum, default_value_t = EnrichmentPolicy::Required, global = true)]
    pub enrichment: EnrichmentPolicy,
}

impl ServiceOptions {
    pub fn into_config(self) -> Result<ServerConfig> {
        let source = find_profile(&self.source).ok_or_else(|| {
            anyhow!(
                "unknown source '{}' (available: {})",
                self.source,
                profile_keys().join(", ")
            )
        })?;

        Ok(ServerConfig {
            bind: SocketAddr::new(self.host, self.port),
            environment: Environment::resolve(
                self.environment.as_deref(),
                std::env::var("NODE_ENV").ok().as_deref(),
            ),
            source,
            source_url: self.source_url,
            names_url: self.names_url,
            max_browsers: self.max_browsers,
            chrome_path: self.chrome_path,
            enrichment: self.enrichment,
        })
    }
}
