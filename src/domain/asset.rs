//! Market asset types.
//!
//! An `Asset` is one tradable instrument as shown by the coin tracker and
//! ticker. Field names follow the CoinGecko markets payload so the same
//! JSON shape travels through the cache file and the consumer API.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Stable asset identifier (e.g. "bitcoin").
pub type AssetId = String;

/// Snapshot of one tradable instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Stable unique identifier.
    pub id: AssetId,
    /// Short ticker, case as delivered by the source.
    pub symbol: String,
    /// Human-readable name.
    pub name: String,
    /// Icon URL. May be absent for exchange ticker sources.
    #[serde(default)]
    pub image: Option<String>,
    /// Latest price in quote currency.
    pub current_price: f64,
    /// Market capitalization, or 24h quote volume for ticker sources.
    #[serde(default)]
    pub market_cap: Option<f64>,
    /// Signed 24h change in percent.
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    /// Trailing 7-day samples, oldest first.
    #[serde(default)]
    pub sparkline_in_7d: Option<Sparkline>,
}

/// Ordered 7-day price samples used for rendering only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sparkline {
    pub price: Vec<f64>,
}

/// Direction of a 7-day sparkline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
}

impl Sparkline {
    /// Up when the newest sample is at or above the oldest.
    pub fn trend(&self) -> Option<Trend> {
        let first = self.price.first()?;
        let last = self.price.last()?;
        Some(if last >= first { Trend::Up } else { Trend::Down })
    }
}

impl Asset {
    /// Ticker symbol upper-cased for presentation.
    pub fn display_symbol(&self) -> String {
        self.symbol.to_uppercase()
    }

    /// Non-negative 24h change. A missing change counts as a gain.
    pub fn is_gainer(&self) -> bool {
        self.price_change_percentage_24h.unwrap_or(0.0) >= 0.0
    }

    /// 7-day trend, if a sparkline is present.
    pub fn trend(&self) -> Option<Trend> {
        self.sparkline_in_7d.as_ref().and_then(Sparkline::trend)
    }
}

/// Persisted snapshot set with the time it was fetched.
///
/// Stored as `{ "assets": [...], "timestamp": <unix ms> }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Snapshot set from one successful fetch.
    pub assets: Vec<Asset>,
    /// Fetch time (Unix ms).
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,
}

impl CacheRecord {
    /// Build a record stamped with the given fetch time.
    pub fn new(assets: Vec<Asset>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            assets,
            timestamp_ms: fetched_at.timestamp_millis(),
        }
    }

    /// Fetch time as a `DateTime`, if the stored value is representable.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp_ms).single()
    }

    /// Whether the record is younger than `ttl` at `now`.
    ///
    /// Records stamped in the future are treated as expired.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let age_ms = now.timestamp_millis() - self.timestamp_ms;
        age_ms >= 0 && age_ms < ttl.num_milliseconds()
    }
}
