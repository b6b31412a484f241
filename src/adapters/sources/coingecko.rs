//! CoinGecko Markets Source - Asset-Listing API
//!
//! One GET to `/coins/markets` per cycle, ordered by market cap, with
//! 7-day sparklines. Records the API returns without a price are
//! dropped rather than failing the whole snapshot.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::http::{build_client, get_json};
use crate::config::SourceConfig;
use crate::domain::{Asset, FetchResult, Sparkline};
use crate::ports::AssetDataSource;

/// One row of the `/coins/markets` response.
#[derive(Debug, Deserialize)]
struct MarketRow {
    id: String,
    symbol: String,
    name: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    current_price: Option<f64>,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    sparkline_in_7d: Option<SparklineRow>,
}

#[derive(Debug, Deserialize)]
struct SparklineRow {
    #[serde(default)]
    price: Vec<Option<f64>>,
}

impl MarketRow {
    fn into_asset(self) -> Option<Asset> {
        let current_price = self.current_price.filter(|p| p.is_finite())?;
        Some(Asset {
            id: self.id,
            symbol: self.symbol,
            name: self.name,
            image: self.image,
            current_price,
            market_cap: self.market_cap,
            price_change_percentage_24h: self.price_change_percentage_24h,
            sparkline_in_7d: self.sparkline_in_7d.map(|s| Sparkline {
                price: s.price.into_iter().flatten().collect(),
            }),
        })
    }
}

/// Asset-listing source.
pub struct CoinGeckoSource {
    http: Client,
    markets_url: String,
    vs_currency: String,
    per_page: u32,
    api_key: Option<String>,
    timeout: Duration,
}

impl CoinGeckoSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            http: build_client(config.timeout())?,
            markets_url: format!(
                "{}/coins/markets",
                config.resolved_base_url().trim_end_matches('/')
            ),
            vs_currency: config.vs_currency.clone(),
            per_page: config.per_page,
            api_key: config.api_key.clone(),
            timeout: config.timeout(),
        })
    }
}

#[async_trait]
impl AssetDataSource for CoinGeckoSource {
    #[instrument(skip_all, fields(url = %self.markets_url))]
    async fn fetch_assets(&self, cancel: &CancellationToken) -> FetchResult<Vec<Asset>> {
        let per_page = self.per_page.to_string();
        let mut request = self.http.get(&self.markets_url).query(&[
            ("vs_currency", self.vs_currency.as_str()),
            ("order", "market_cap_desc"),
            ("per_page", per_page.as_str()),
            ("page", "1"),
            ("sparkline", "true"),
        ]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("x_cg_demo_api_key", key.as_str())]);
        }

        let rows: Vec<MarketRow> = get_json(request, cancel, self.timeout).await?;
        let total = rows.len();
        let assets: Vec<Asset> = rows.into_iter().filter_map(MarketRow::into_asset).collect();
        debug!(rows = total, kept = assets.len(), "CoinGecko markets decoded");

        Ok(assets)
    }

    fn name(&self) -> &'static str {
        "coingecko"
    }
}
