//! The scrape-and-merge procedure
//!
//! One run: check out a browser slot, launch, navigate, set the page
//! controls, read the table, close the browser, then join company names from
//! the symbol feed. Steps are strictly sequential and nothing is retried.

use anyhow::Context;
use chrono::Utc;
use clap::ValueEnum;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::error::ScrapeError;
use crate::models::{ScrapeReport, ScrapedRow};
use crate::names::{fetch_name_index, merge_names, SymbolNameIndex};
use crate::scraping::extract::extract_rows;
use crate::scraping::settle::{wait_until_stable, SettleOutcome, SettlePolicy};
use crate::scraping::{BrowserPool, BrowserSession};
use crate::sources::{NameSource, ScrapeTarget};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; PsxScraper/1.0)";
const FEED_TIMEOUT: Duration = Duration::from_secs(30);

/// What a name feed outage does to an otherwise good scrape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum EnrichmentPolicy {
    /// Fail the request
    #[default]
    Required,
    /// Serve names equal to symbols and report a warning
    BestEffort,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    pub enrichment: EnrichmentPolicy,
    pub settle: SettlePolicy,
}

pub struct Pipeline {
    pool: BrowserPool,
    client: Client,
    target: ScrapeTarget,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        pool: BrowserPool,
        target: ScrapeTarget,
        options: PipelineOptions,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FEED_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(pool, client, target, options))
    }

    pub fn with_client(
        pool: BrowserPool,
        client: Client,
        target: ScrapeTarget,
        options: PipelineOptions,
    ) -> Self {
        Self {
            pool,
            client,
            target,
            options,
        }
    }

    pub fn target(&self) -> &ScrapeTarget {
        &self.target
    }

    pub fn pool(&self) -> &BrowserPool {
        &self.pool
    }

    /// Run the whole procedure once
    pub async fn run(&self) -> Result<ScrapeReport, ScrapeError> {
        let started = Instant::now();
        info!(
            "Starting scrape of {} ({})",
            self.target.profile.label, self.target.page_url
        );

        let checkout = self
            .pool
            .checkout()
            .await
            .map_err(|_| ScrapeError::Capacity)?;
        let target = self.target.clone();
        let settle = self.options.settle;

        let rows = tokio::task::spawn_blocking(move || {
            info!("Starting browser...");
            let mut session = checkout.launch().map_err(ScrapeError::Launch)?;
            let rows = scrape_page(&mut *session, &target, &settle);
            // browser closes before the slot is released
            drop(session);
            drop(checkout);
            rows
        })
        .await??;

        info!("Scraped {} stocks from {}", rows.len(), self.target.profile.label);

        let (index, warnings) = self.load_names(&rows).await?;
        let stocks = merge_names(rows, index.as_ref());

        info!(
            "Scrape finished: {} stocks in {:.1}s",
            stocks.len(),
            started.elapsed().as_secs_f64()
        );

        Ok(ScrapeReport {
            stocks,
            captured_at: Utc::now(),
            warnings,
        })
    }

    async fn load_names(
        &self,
        rows: &[ScrapedRow],
    ) -> Result<(Option<SymbolNameIndex>, Vec<String>), ScrapeError> {
        let Some(url) = self.target.names_url.as_deref() else {
            return Ok((None, Vec::new()));
        };
        // An inline-name page only needs the feed as a fallback
        if self.target.profile.names == NameSource::Inline
            && rows.iter().all(|r| r.name.is_some())
        {
            return Ok((None, Vec::new()));
        }

        match fetch_name_index(&self.client, url).await {
            Ok(index) => Ok((Some(index), Vec::new())),
            Err(e) => match self.options.enrichment {
                EnrichmentPolicy::Required => Err(ScrapeError::NameFeed(e)),
                EnrichmentPolicy::BestEffort => {
                    warn!("Symbol feed unavailable, serving symbols as names: {:#}", e);
                    Ok((None, vec![format!("company names unavailable: {:#}", e)]))
                }
            },
        }
    }
}

/// Drive an already launched session through navigation, controls and
/// extraction. Blocking; the caller owns closing the session.
pub fn scrape_page(
    session: &mut dyn BrowserSession,
    target: &ScrapeTarget,
    settle: &SettlePolicy,
) -> Result<Vec<ScrapedRow>, ScrapeError> {
    let profile = target.profile;

    info!("Navigating to {}...", target.page_url);
    session
        .navigate(
            &target.page_url,
            profile.ready_selector,
            profile.navigation_timeout,
        )
        .map_err(ScrapeError::Navigation)?;

    if !profile.controls.is_empty() {
        info!("Waiting for page controls...");
        session
            .wait_for(profile.controls_selector, profile.controls_timeout)
            .map_err(ScrapeError::Controls)?;

        for step in profile.controls {
            info!("Selecting {} = {}", step.label, step.value);
            let before = session.count(profile.table.row_selector).ok();
            let found = session
                .select_option(profile.controls_selector, step.position, step.value)
                .map_err(ScrapeError::Controls)?;
            if !found {
                warn!(
                    "No {} control at position {}; leaving page as is",
                    step.label, step.position
                );
                continue;
            }

            let outcome = wait_until_stable(settle, step.settle, before, || {
                session.count(profile.table.row_selector)
            });
            if let SettleOutcome::Stable(rows) = outcome {
                info!("Table settled at {} rows", rows);
            }
        }
    }

    info!("Extracting stock data...");
    let html = session.content().map_err(ScrapeError::Extraction)?;
    extract_rows(&html, &profile.table).map_err(ScrapeError::Extraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{PSX_KSE100_INDEX, PSX_MARKET_WATCH};
    use anyhow::{bail, Result};

    #[derive(Default)]
    struct ScriptedSession {
        html: String,
        select_count: usize,
        fail_controls: bool,
        /// Polls that still show the pre-selection count
        render_lag: u32,
        stale_polls: u32,
        selections: Vec<(usize, String)>,
    }

    impl BrowserSession for ScriptedSession {
        fn navigate(&mut self, _: &str, _: &str, _: Duration) -> Result<()> {
            Ok(())
        }
        fn wait_for(&mut self, selector: &str, _: Duration) -> Result<()> {
            if self.fail_controls {
                bail!("Timed out waiting for '{}'", selector)
            }
            Ok(())
        }
        fn count(&mut self, _: &str) -> Result<usize> {
            if self.stale_polls > 0 {
                self.stale_polls -= 1;
                return Ok(self.selections.len() - 1);
            }
            Ok(self.selections.len())
        }
        fn select_option(&mut self, _: &str, position: usize, value: &str) -> Result<bool> {
            if position >= self.select_count {
                return Ok(false);
            }
            self.selections.push((position, value.to_string()));
            self.stale_polls = self.render_lag;
            Ok(true)
        }
        fn content(&mut self) -> Result<String> {
            Ok(self.html.clone())
        }
        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn fast_settle() -> SettlePolicy {
        SettlePolicy {
            poll_interval: Duration::from_millis(1),
            stable_polls: 2,
            min_wait: Duration::ZERO,
        }
    }

    const ONE_ROW: &str = "<table><tbody><tr><td>HUBC</td><td>a</td><td>b</td><td>c</td><td>d</td><td>e</td><td>150.25</td></tr></tbody></table>";

    #[test]
    fn test_controls_applied_in_profile_order() {
        let mut session = ScriptedSession {
            html: ONE_ROW.to_string(),
            select_count: 2,
            ..Default::default()
        };
        let target = ScrapeTarget::from_profile(&PSX_MARKET_WATCH).unwrap();
        let rows = scrape_page(&mut session, &target, &fast_settle()).unwrap();

        assert_eq!(
            session.selections,
            vec![(1, "KSE100".to_string()), (0, "-1".to_string())]
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "HUBC");
        assert_eq!(rows[0].price, 150.25);
    }

    #[test]
    fn test_settle_waits_for_count_to_leave_old_value() {
        let mut session = ScriptedSession {
            html: ONE_ROW.to_string(),
            select_count: 2,
            render_lag: 5,
            ..Default::default()
        };
        let target = ScrapeTarget::from_profile(&PSX_MARKET_WATCH).unwrap();
        let rows = scrape_page(&mut session, &target, &fast_settle()).unwrap();

        // every stale reading was polled through before moving on
        assert_eq!(session.stale_polls, 0);
        assert_eq!(session.selections.len(), 2);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_missing_controls_are_skipped() {
        let mut session = ScriptedSession {
            html: ONE_ROW.to_string(),
            select_count: 1,
            ..Default::default()
        };
        let target = ScrapeTarget::from_profile(&PSX_MARKET_WATCH).unwrap();
        let rows = scrape_page(&mut session, &target, &fast_settle()).unwrap();
        assert_eq!(session.selections, vec![(0, "-1".to_string())]);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_controls_timeout_is_reported() {
        let mut session = ScriptedSession {
            fail_controls: true,
            ..Default::default()
        };
        let target = ScrapeTarget::from_profile(&PSX_MARKET_WATCH).unwrap();
        let err = scrape_page(&mut session, &target, &fast_settle()).unwrap_err();
        assert!(matches!(err, ScrapeError::Controls(_)));
    }

    #[test]
    fn test_profile_without_controls_skips_waiting() {
        let mut session = ScriptedSession {
            html: "<table><tbody><tr><td><strong>SYS</strong><span>Systems Ltd</span></td><td>1</td><td>2</td><td>410.00</td></tr></tbody></table>".to_string(),
            fail_controls: true,
            ..Default::default()
        };
        let target = ScrapeTarget::from_profile(&PSX_KSE100_INDEX).unwrap();
        let rows = scrape_page(&mut session, &target, &fast_settle()).unwrap();
        assert_eq!(rows[0].name.as_deref(), Some("Systems Ltd"));
        assert!(session.selections.is_empty());
    }
}
