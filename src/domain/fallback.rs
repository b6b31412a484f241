//! Hardcoded fallback snapshot.
//!
//! Shown only when no live or cached data has ever been available, so the
//! tracker is never blank. Prices are indicative.

use super::asset::Asset;

const FALLBACK: &[(&str, &str, &str, f64, f64, f64)] = &[
    ("bitcoin", "btc", "Bitcoin", 65_000.0, 1_280_000_000_000.0, 0.0),
    ("ethereum", "eth", "Ethereum", 3_200.0, 385_000_000_000.0, 0.0),
    ("tether", "usdt", "Tether", 1.0, 112_000_000_000.0, 0.0),
    ("binancecoin", "bnb", "BNB", 580.0, 85_000_000_000.0, 0.0),
    ("solana", "sol", "Solana", 150.0, 70_000_000_000.0, 0.0),
    ("ripple", "xrp", "XRP", 0.52, 29_000_000_000.0, 0.0),
    ("cardano", "ada", "Cardano", 0.45, 16_000_000_000.0, 0.0),
    ("dogecoin", "doge", "Dogecoin", 0.12, 17_000_000_000.0, 0.0),
];

/// Fallback snapshot set, ordered by market cap.
pub fn fallback_assets() -> Vec<Asset> {
    FALLBACK
        .iter()
        .map(|&(id, symbol, name, price, cap, change)| Asset {
            id: id.to_string(),
            symbol: symbol.to_string(),
            name: name.to_string(),
            image: None,
            current_price: price,
            market_cap: Some(cap),
            price_change_percentage_24h: Some(change),
            sparkline_in_7d: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_non_empty_and_unique() {
        let assets = fallback_assets();
        assert!(!assets.is_empty());
        let mut ids: Vec<_> = assets.iter().map(|a| a.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), assets.len());
        assert!(assets.iter().all(|a| a.current_price > 0.0));
    }
}
