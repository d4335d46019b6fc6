//! PSX scraper - KSE-100 prices from the Pakistan Stock Exchange
//!
//! This library drives a headless browser against dps.psx.com.pk (or a
//! mirror), reads the market table, joins company names from the PSX symbol
//! feed and serves the result over HTTP.

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod names;
pub mod pipeline;
pub mod scraping;
pub mod server;
pub mod sources;
