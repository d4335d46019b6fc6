//! Company name enrichment
//!
//! PSX publishes `GET /symbols`, a JSON array of `{symbol, name, ...}`
//! objects. The market table only carries tickers, so names are joined in
//! from that feed once per request.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::info;

use crate::models::{ScrapedRow, StockRecord};

/// One entry of the symbol feed; extra fields (sector, ETF flags) are ignored.
/// Entries without a symbol are skipped when indexing.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolEntry {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Request-scoped symbol → name lookup
#[derive(Debug, Clone, Default)]
pub struct SymbolNameIndex {
    names: HashMap<String, String>,
}

impl SymbolNameIndex {
    /// Build from feed entries. A later duplicate wins; blank names are kept
    /// out so lookups fall back to the symbol.
    pub fn from_entries(entries: impl IntoIterator<Item = SymbolEntry>) -> Self {
        let mut names = HashMap::new();
        for entry in entries {
            let Some(symbol) = entry.symbol.map(|s| s.trim().to_string()) else {
                continue;
            };
            if symbol.is_empty() {
                continue;
            }
            match entry.name.map(|n| n.trim().to_string()) {
                Some(name) if !name.is_empty() => {
                    names.insert(symbol, name);
                }
                _ => {
                    names.remove(&symbol);
                }
            }
        }
        Self { names }
    }

    pub fn get(&self, symbol: &str) -> Option<&str> {
        self.names.get(symbol).map(String::as_str)
    }

    /// Name for `symbol`, or the symbol itself when the feed has none
    pub fn resolve<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.get(symbol).unwrap_or(symbol)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Fetch and index the symbol feed
pub async fn fetch_name_index(client: &Client, url: &str) -> Result<SymbolNameIndex> {
    info!("Fetching symbol names from {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to send request to {}", url))?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Symbol feed returned error status: {}",
            response.status()
        ));
    }

    let entries: Vec<SymbolEntry> = response
        .json()
        .await
        .context("Failed to parse symbol feed response")?;

    let index = SymbolNameIndex::from_entries(entries);
    info!("Loaded {} symbol names", index.len());
    Ok(index)
}

/// Resolve names for scraped rows, preserving order.
///
/// Precedence: name read from the table, then the feed, then the symbol.
pub fn merge_names(rows: Vec<ScrapedRow>, index: Option<&SymbolNameIndex>) -> Vec<StockRecord> {
    rows.into_iter()
        .map(|row| {
            let name = match row.name {
                Some(name) if !name.is_empty() => name,
                _ => index
                    .and_then(|idx| idx.get(&row.symbol))
                    .unwrap_or(&row.symbol)
                    .to_string(),
            };
            StockRecord {
                symbol: row.symbol,
                name,
                price: row.price,
            }
        })
        .collect()
}
