//! Binance 24h Ticker Source - Exchange Ticker API
//!
//! Reads `/api/v3/ticker/24hr` and keeps pairs quoted in the configured
//! quote asset whose base symbol has a display name. Quote volume stands
//! in for market cap, so ordering is by traded value.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::http::{build_client, get_json, parse_number};
use crate::config::SourceConfig;
use crate::domain::{Asset, FetchResult};
use crate::ports::AssetDataSource;

/// Base symbols with a built-in display name.
const KNOWN_NAMES: &[(&str, &str)] = &[
    ("BTC", "Bitcoin"),
    ("ETH", "Ethereum"),
    ("BNB", "BNB"),
    ("SOL", "Solana"),
    ("XRP", "XRP"),
    ("ADA", "Cardano"),
    ("DOGE", "Dogecoin"),
    ("TRX", "TRON"),
    ("AVAX", "Avalanche"),
    ("DOT", "Polkadot"),
    ("LINK", "Chainlink"),
    ("MATIC", "Polygon"),
    ("LTC", "Litecoin"),
    ("SHIB", "Shiba Inu"),
    ("BCH", "Bitcoin Cash"),
    ("UNI", "Uniswap"),
    ("ATOM", "Cosmos"),
    ("XLM", "Stellar"),
    ("NEAR", "NEAR Protocol"),
    ("APT", "Aptos"),
    ("ARB", "Arbitrum"),
    ("OP", "Optimism"),
    ("FIL", "Filecoin"),
    ("TON", "Toncoin"),
    ("SUI", "Sui"),
];

/// One row of the 24h ticker response. Numbers arrive as strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TickerRow {
    symbol: String,
    last_price: String,
    price_change_percent: String,
    quote_volume: String,
}

/// Exchange ticker source.
pub struct BinanceTickerSource {
    http: Client,
    ticker_url: String,
    quote_asset: String,
    names: HashMap<String, String>,
    limit: usize,
    timeout: Duration,
}

impl BinanceTickerSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let mut names: HashMap<String, String> = KNOWN_NAMES
            .iter()
            .map(|(symbol, name)| ((*symbol).to_string(), (*name).to_string()))
            .collect();
        for (symbol, name) in &config.names {
            names.insert(symbol.to_uppercase(), name.clone());
        }

        Ok(Self {
            http: build_client(config.timeout())?,
            ticker_url: format!(
                "{}/api/v3/ticker/24hr",
                config.resolved_base_url().trim_end_matches('/')
            ),
            quote_asset: config.quote_asset.to_uppercase(),
            names,
            limit: config.limit,
            timeout: config.timeout(),
        })
    }

    /// Map ticker rows into a volume-ordered snapshot set.
    fn map_rows(&self, rows: Vec<TickerRow>) -> Vec<Asset> {
        let mut assets: Vec<Asset> = rows
            .into_iter()
            .filter_map(|row| self.map_row(row))
            .collect();

        assets.sort_by(|a, b| {
            b.market_cap
                .unwrap_or(0.0)
                .total_cmp(&a.market_cap.unwrap_or(0.0))
        });
        assets.truncate(self.limit);
        assets
    }

    fn map_row(&self, row: TickerRow) -> Option<Asset> {
        let base = row.symbol.strip_suffix(&self.quote_asset)?;
        let name = self.names.get(base)?;
        let current_price = parse_number(&row.last_price)?;

        Some(Asset {
            id: slug(name),
            symbol: base.to_lowercase(),
            name: name.clone(),
            image: None,
            current_price,
            market_cap: parse_number(&row.quote_volume),
            price_change_percentage_24h: parse_number(&row.price_change_percent),
            sparkline_in_7d: None,
        })
    }
}

/// `Shiba Inu` -> `shiba-inu`.
fn slug(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

#[async_trait]
impl AssetDataSource for BinanceTickerSource {
    #[instrument(skip_all, fields(url = %self.ticker_url))]
    async fn fetch_assets(&self, cancel: &CancellationToken) -> FetchResult<Vec<Asset>> {
        let rows: Vec<TickerRow> =
            get_json(self.http.get(&self.ticker_url), cancel, self.timeout).await?;
        let total = rows.len();
        let assets = self.map_rows(rows);
        debug!(rows = total, kept = assets.len(), "Binance tickers decoded");
        Ok(assets)
    }

    fn name(&self) -> &'static str {
        "binance"
    }
}
