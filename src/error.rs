//! Error handling for the scrape pipeline
//!
//! Collaborators (browser driver, HTML extraction, name feed) return
//! `anyhow::Result` with context chains. The pipeline sorts those failures
//! into the request-level taxonomy below, which is what the HTTP layer sees.

use thiserror::Error;

/// Request-level scrape failures
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("failed to launch browser: {0:#}")]
    Launch(anyhow::Error),

    #[error("navigation failed: {0:#}")]
    Navigation(anyhow::Error),

    #[error("page controls unavailable: {0:#}")]
    Controls(anyhow::Error),

    #[error("table extraction failed: {0:#}")]
    Extraction(anyhow::Error),

    #[error("symbol name feed failed: {0:#}")]
    NameFeed(anyhow::Error),

    #[error("browser pool is closed")]
    Capacity,

    #[error("scrape task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ScrapeError {
    /// Full diagnostic rendering: the context chain and, when
    /// `RUST_BACKTRACE` is set, the captured backtrace.
    pub fn diagnostic(&self) -> String {
        match self {
            ScrapeError::Launch(e)
            | ScrapeError::Navigation(e)
            | ScrapeError::Controls(e)
            | ScrapeError::Extraction(e)
            | ScrapeError::NameFeed(e) => format!("{:?}", e),
            ScrapeError::Capacity => self.to_string(),
            ScrapeError::Task(e) => format!("{:?}", e),
        }
    }
}

/// Result type alias for collaborators of the pipeline
pub type Result<T> = anyhow::Result<T>;
