//! Market Data Source Adapters
//!
//! Implementations of `AssetDataSource`:
//! - `coingecko`: asset-listing API with sparklines
//! - `binance`: exchange 24h ticker API with synthetic names
//! - `http`: shared client construction and failure classification

pub mod binance;
pub mod coingecko;
pub mod http;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

pub use binance::BinanceTickerSource;
pub use coingecko::CoinGeckoSource;

use crate::config::{SourceConfig, SourceKind};
use crate::ports::AssetDataSource;

/// Build the configured source.
pub fn build_source(config: &SourceConfig) -> Result<Arc<dyn AssetDataSource>> {
    let source: Arc<dyn AssetDataSource> = match config.kind {
        SourceKind::Coingecko => Arc::new(CoinGeckoSource::new(config)?),
        SourceKind::Binance => Arc::new(BinanceTickerSource::new(config)?),
    };
    info!(
        source = source.name(),
        base_url = %config.resolved_base_url(),
        "Market data source configured"
    );
    Ok(source)
}
