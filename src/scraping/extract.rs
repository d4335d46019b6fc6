//! Table extraction
//!
//! Turns the rendered page HTML into priced rows using the positional
//! layout of a [`TableLayout`]. Structural mismatches and unusable values
//! drop the row; they never fail the whole extraction.

use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::models::ScrapedRow;
use crate::sources::TableLayout;

/// Extract every usable row, in document order.
///
/// Errors only when the layout's selectors are not valid CSS.
pub fn extract_rows(html: &str, layout: &TableLayout) -> Result<Vec<ScrapedRow>> {
    let document = Html::parse_document(html);
    let row_sel = parse_selector(layout.row_selector)?;
    let cell_sel = parse_selector(layout.cell_selector)?;
    let compound = match layout.compound_symbol {
        Some(c) => Some((
            parse_selector(c.symbol_selector)?,
            parse_selector(c.name_selector)?,
        )),
        None => None,
    };

    let mut rows = Vec::new();
    for (index, row) in document.select(&row_sel).enumerate() {
        let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
        if cells.len() < layout.min_columns {
            debug!(
                "Skipping row {}: {} cells, expected at least {}",
                index,
                cells.len(),
                layout.min_columns
            );
            continue;
        }
        let (Some(symbol_cell), Some(price_cell)) = (
            cells.get(layout.symbol_column),
            cells.get(layout.price_column),
        ) else {
            continue;
        };

        let (symbol, name) = match &compound {
            Some((symbol_sel, name_sel)) => read_compound_cell(symbol_cell, symbol_sel, name_sel),
            None => (cell_text(symbol_cell), None),
        };

        if symbol.is_empty() {
            debug!("Skipping row {}: empty symbol", index);
            continue;
        }

        let Some(price) = parse_price(&cell_text(price_cell)) else {
            debug!("Skipping row {} ({}): no usable price", index, symbol);
            continue;
        };

        rows.push(ScrapedRow {
            symbol,
            name,
            price,
        });
    }

    Ok(rows)
}

/// Parse a price cell such as `"1,234.50"`.
///
/// Returns `None` for blank, non-numeric, zero or negative values: zero is
/// how the source renders "no trade", not a real price.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    let price: f64 = cleaned.parse().ok()?;
    if price.is_finite() && price > 0.0 {
        Some(price)
    } else {
        None
    }
}

fn read_compound_cell(
    cell: &ElementRef,
    symbol_sel: &Selector,
    name_sel: &Selector,
) -> (String, Option<String>) {
    let symbol = cell
        .select(symbol_sel)
        .next()
        .map(|node| cell_text(&node))
        // plain cell on a page that usually packs both
        .unwrap_or_else(|| cell_text(cell));
    let name = cell
        .select(name_sel)
        .next()
        .map(|node| display_text(&node))
        .filter(|n| !n.is_empty());
    (symbol, name)
}

/// Text nodes concatenated as the DOM's `textContent` does, then trimmed.
/// `1,234<small>.50</small>` reads as `1,234.50`.
fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Cell text with inner whitespace runs collapsed, for multi-word names
fn display_text(cell: &ElementRef) -> String {
    cell.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid CSS selector '{}': {}", css, e))
}
