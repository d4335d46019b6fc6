// Source site profiles
//
// dps.psx.com.pk and its mirrors render the market table client-side and
// expose no stable ids, so everything is positional. Each layout fact lives
// here as a named constant; a site redesign is a one-line edit below.

use std::time::Duration;

/// A `<select>` on the page that must be changed before the full table renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlStep {
    /// Human label for logs
    pub label: &'static str,
    /// Zero-based position among the page's `select` elements
    pub position: usize,
    /// Option value to choose
    pub value: &'static str,
    /// Upper bound on the wait for the table to re-render afterwards
    pub settle: Duration,
}

/// Symbol and name packed in one cell as sibling sub-elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompoundCell {
    pub symbol_selector: &'static str,
    pub name_selector: &'static str,
}

/// Column layout of the data table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    pub row_selector: &'static str,
    pub cell_selector: &'static str,
    /// Rows with fewer cells are structural noise (headers, ads, spacers)
    pub min_columns: usize,
    pub symbol_column: usize,
    pub price_column: usize,
    pub compound_symbol: Option<CompoundCell>,
}

/// Where company names come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSource {
    /// The table carries names (compound symbol cell); no feed needed
    Inline,
    /// JSON array of `{symbol, name}` objects
    Feed(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceProfile {
    pub key: &'static str,
    pub label: &'static str,
    /// Empty when the page has to be supplied by the operator
    pub page_url: &'static str,
    /// Waiting for this instead of network idle; PSX keeps a live socket open
    pub ready_selector: &'static str,
    pub navigation_timeout: Duration,
    pub controls_selector: &'static str,
    pub controls_timeout: Duration,
    pub controls: &'static [ControlStep],
    pub table: TableLayout,
    pub names: NameSource,
}

const PSX_SYMBOLS_FEED: &str = "https://dps.psx.com.pk/symbols";

const MARKET_WATCH_TABLE: TableLayout = TableLayout {
    row_selector: "table tbody tr",
    cell_selector: "td",
    min_columns: 7,
    symbol_column: 0,
    // CURRENT, not CHANGE %
    price_column: 6,
    compound_symbol: None,
};

pub const PSX_MARKET_WATCH: SourceProfile = SourceProfile {
    key: "psx-market-watch",
    label: "PSX market watch",
    page_url: "https://dps.psx.com.pk/",
    ready_selector: "body",
    navigation_timeout: Duration::from_secs(30),
    controls_selector: "select",
    controls_timeout: Duration::from_secs(10),
    controls: &[
        ControlStep {
            label: "index filter",
            position: 1,
            value: "KSE100",
            settle: Duration::from_secs(2),
        },
        ControlStep {
            label: "page size",
            position: 0,
            // DataTables uses -1 for "All"
            value: "-1",
            settle: Duration::from_secs(3),
        },
    ],
    table: MARKET_WATCH_TABLE,
    names: NameSource::Feed(PSX_SYMBOLS_FEED),
};

pub const PSX_KSE100_INDEX: SourceProfile = SourceProfile {
    key: "psx-kse100-index",
    label: "PSX KSE-100 constituents",
    page_url: "https://dps.psx.com.pk/indices/KSE100",
    ready_selector: "table tbody tr",
    navigation_timeout: Duration::from_secs(30),
    controls_selector: "select",
    controls_timeout: Duration::from_secs(10),
    controls: &[],
    table: TableLayout {
        row_selector: "table tbody tr",
        cell_selector: "td",
        min_columns: 4,
        symbol_column: 0,
        price_column: 3,
        compound_symbol: Some(CompoundCell {
            symbol_selector: "strong",
            name_selector: "span, small",
        }),
    },
    names: NameSource::Inline,
};

pub const PSX_MIRROR: SourceProfile = SourceProfile {
    key: "psx-mirror",
    label: "PSX mirror",
    page_url: "",
    ready_selector: "body",
    navigation_timeout: Duration::from_secs(60),
    controls_selector: "select",
    controls_timeout: Duration::from_secs(15),
    controls: &[
        ControlStep {
            label: "index filter",
            position: 0,
            value: "KSE100",
            settle: Duration::from_secs(3),
        },
        ControlStep {
            label: "page size",
            position: 1,
            value: "-1",
            settle: Duration::from_secs(3),
        },
    ],
    table: MARKET_WATCH_TABLE,
    names: NameSource::Feed(PSX_SYMBOLS_FEED),
};

pub const PROFILES: &[SourceProfile] = &[PSX_MARKET_WATCH, PSX_KSE100_INDEX, PSX_MIRROR];

pub fn find_profile(key: &str) -> Option<&'static SourceProfile> {
    let key = key.trim();
    PROFILES.iter().find(|p| p.key.eq_ignore_ascii_case(key))
}

pub fn profile_keys() -> Vec<&'static str> {
    PROFILES.iter().map(|p| p.key).collect()
}

/// A profile with its endpoints resolved against operator overrides
#[derive(Debug, Clone)]
pub struct ScrapeTarget {
    pub profile: &'static SourceProfile,
    pub page_url: String,
    /// `None` when names come from the table itself
    pub names_url: Option<String>,
}

impl ScrapeTarget {
    pub fn new(
        profile: &'static SourceProfile,
        page_url: Option<String>,
        names_url: Option<String>,
    ) -> anyhow::Result<Self> {
        let page_url = page_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| profile.page_url.to_string());
        if page_url.is_empty() {
            anyhow::bail!(
                "source profile '{}' has no default page URL; pass --source-url",
                profile.key
            );
        }

        let names_url = match profile.names {
            NameSource::Feed(default) => Some(names_url.unwrap_or_else(|| default.to_string())),
            NameSource::Inline => names_url,
        };

        Ok(Self {
            profile,
            page_url,
            names_url,
        })
    }

    pub fn from_profile(profile: &'static SourceProfile) -> anyhow::Result<Self> {
        Self::new(profile, None, None)
    }
}
