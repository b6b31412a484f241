//! Derived Views - Pure Projections over a Snapshot Set
//!
//! Filtering, search, sorting and the ticker marquee used by the
//! consumer API. Nothing here mutates supervisor state: every function
//! takes a borrowed slice and returns references into it.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::asset::Asset;

/// Number of assets shown on the scrolling ticker.
pub const TICKER_LENGTH: usize = 25;

/// Gain/loss filter for the tracker table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    All,
    Gainers,
    Losers,
}

impl FilterMode {
    /// Sort applied when the filter is selected.
    pub const fn default_sort(self) -> SortConfig {
        match self {
            Self::All => SortConfig::new(SortKey::MarketCap, SortDirection::Desc),
            Self::Gainers => SortConfig::new(SortKey::PriceChange24h, SortDirection::Desc),
            Self::Losers => SortConfig::new(SortKey::PriceChange24h, SortDirection::Asc),
        }
    }

    fn accepts(self, asset: &Asset) -> bool {
        match self {
            Self::All => true,
            Self::Gainers => asset.is_gainer(),
            Self::Losers => !asset.is_gainer(),
        }
    }
}

/// Sortable columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Name,
    Symbol,
    CurrentPrice,
    MarketCap,
    #[serde(rename = "price_change_percentage_24h")]
    PriceChange24h,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortConfig {
    pub const fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Column-header click: ascending first, descending when the same
    /// column is already ascending.
    pub fn request(previous: Option<Self>, key: SortKey) -> Self {
        let direction = match previous {
            Some(prev) if prev.key == key && prev.direction == SortDirection::Asc => {
                SortDirection::Desc
            }
            _ => SortDirection::Asc,
        };
        Self { key, direction }
    }
}

/// Keep assets matching the gain/loss filter.
pub fn filter_by_mode(assets: &[Asset], mode: FilterMode) -> Vec<&Asset> {
    assets.iter().filter(|a| mode.accepts(a)).collect()
}

/// Case-insensitive substring match over name or symbol.
pub fn matches_search(asset: &Asset, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    term.is_empty()
        || asset.name.to_lowercase().contains(&term)
        || asset.symbol.to_lowercase().contains(&term)
}

/// Stable sort. Missing values go last in either direction.
pub fn sort_assets(assets: &mut [&Asset], config: SortConfig) {
    assets.sort_by(|a, b| compare(a, b, config));
}

fn compare(a: &Asset, b: &Asset, config: SortConfig) -> Ordering {
    match config.key {
        SortKey::Name => directed(a.name.to_lowercase().cmp(&b.name.to_lowercase()), config),
        SortKey::Symbol => directed(
            a.symbol.to_lowercase().cmp(&b.symbol.to_lowercase()),
            config,
        ),
        SortKey::CurrentPrice => compare_numbers(Some(a.current_price), Some(b.current_price), config),
        SortKey::MarketCap => compare_numbers(a.market_cap, b.market_cap, config),
        SortKey::PriceChange24h => compare_numbers(
            a.price_change_percentage_24h,
            b.price_change_percentage_24h,
            config,
        ),
    }
}

fn compare_numbers(a: Option<f64>, b: Option<f64>, config: SortConfig) -> Ordering {
    let a = a.filter(|v| !v.is_nan());
    let b = b.filter(|v| !v.is_nan());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => directed(a.total_cmp(&b), config),
    }
}

const fn directed(ordering: Ordering, config: SortConfig) -> Ordering {
    match config.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Tracker table query: filter, then sort, then search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableQuery {
    #[serde(default)]
    pub filter: FilterMode,
    #[serde(default)]
    pub search: Option<String>,
    /// Explicit sort; the filter's default sort when absent.
    #[serde(default)]
    pub sort: Option<SortConfig>,
}

impl TableQuery {
    pub fn apply<'a>(&self, assets: &'a [Asset]) -> Vec<&'a Asset> {
        let mut rows = filter_by_mode(assets, self.filter);
        sort_assets(&mut rows, self.sort.unwrap_or_else(|| self.filter.default_sort()));
        if let Some(term) = self.search.as_deref() {
            rows.retain(|a| matches_search(a, term));
        }
        rows
    }
}

/// First `limit` assets twice over, for a seamless scrolling loop.
pub fn marquee(assets: &[Asset], limit: usize) -> Vec<&Asset> {
    let head = &assets[..assets.len().min(limit)];
    head.iter().chain(head.iter()).collect()
}

/// One formatted ticker cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerEntry {
    pub id: String,
    pub symbol: String,
    pub price: String,
    pub change: String,
    pub is_gainer: bool,
}

impl From<&Asset> for TickerEntry {
    fn from(asset: &Asset) -> Self {
        Self {
            id: asset.id.clone(),
            symbol: asset.display_symbol(),
            price: format_price(asset.current_price),
            change: format_change(asset.price_change_percentage_24h),
            is_gainer: asset.is_gainer(),
        }
    }
}

/// `$1,234.50` style: thousands separators, 2 to 6 fraction digits.
pub fn format_price(price: f64) -> String {
    let fixed = format!("{:.6}", price.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let mut frac = frac_part.trim_end_matches('0').to_string();
    while frac.len() < 2 {
        frac.push('0');
    }
    let sign = if price < 0.0 { "-" } else { "" };
    format!("{sign}${}.{frac}", group_thousands(int_part))
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `-1.25%`, or `N/A` when missing.
pub fn format_change(change: Option<f64>) -> String {
    change.map_or_else(|| "N/A".to_string(), |c| format!("{c:.2}%"))
}

/// `$1.28B`, or `N/A` when missing.
pub fn format_billions(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("${:.2}B", v / 1_000_000_000.0))
}
