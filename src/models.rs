//! Data types produced by the scrape pipeline and the JSON payloads served
//! over HTTP.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One priced ticker, ready to serve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    pub symbol: String,
    pub name: String,
    pub price: f64,
}

/// A table row that survived extraction, before names are resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedRow {
    pub symbol: String,
    /// Name read from a compound symbol cell, when the layout carries one
    pub name: Option<String>,
    pub price: f64,
}

/// Outcome of one pipeline run
#[derive(Debug, Clone)]
pub struct ScrapeReport {
    pub stocks: Vec<StockRecord>,
    pub captured_at: DateTime<Utc>,
    /// Non-fatal problems, e.g. a name feed outage under best-effort enrichment
    pub warnings: Vec<String>,
}

/// `GET /` payload
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Success payload of a scrape request
#[derive(Debug, Serialize, Deserialize)]
pub struct ScrapeResponse {
    pub success: bool,
    pub count: usize,
    pub stocks: Vec<StockRecord>,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl From<ScrapeReport> for ScrapeResponse {
    fn from(report: ScrapeReport) -> Self {
        Self {
            success: true,
            count: report.stocks.len(),
            timestamp: report
                .captured_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            stocks: report.stocks,
            warnings: report.warnings,
        }
    }
}

/// Failure payload of a scrape request
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}
