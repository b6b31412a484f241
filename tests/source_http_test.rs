//! HTTP Source Tests - Wire Mapping and Failure Classification
//!
//! Runs the CoinGecko and Binance adapters against a local mockito
//! server and checks every `FetchError` classification path.

use std::io::Write;
use std::time::Duration;

use mockito::Matcher;
use tokio_util::sync::CancellationToken;

use coinwatch::adapters::sources::{BinanceTickerSource, CoinGeckoSource, build_source};
use coinwatch::config::{SourceConfig, SourceKind};
use coinwatch::domain::FetchError;
use coinwatch::ports::AssetDataSource;

const MARKETS_BODY: &str = r#"[
  {"id":"bitcoin","symbol":"btc","name":"Bitcoin","image":"https://img/btc.png",
   "current_price":65000.5,"market_cap":1280000000000,"price_change_percentage_24h":2.5,
   "sparkline_in_7d":{"price":[60000.0,62000.0,65000.5]}},
  {"id":"ethereum","symbol":"eth","name":"Ethereum","image":null,
   "current_price":3100.25,"market_cap":null,"price_change_percentage_24h":null}
]"#;

fn coingecko_config(base_url: String) -> SourceConfig {
    SourceConfig {
        base_url: Some(base_url),
        timeout_seconds: 1,
        ..SourceConfig::default()
    }
}

fn binance_config(base_url: String) -> SourceConfig {
    SourceConfig {
        kind: SourceKind::Binance,
        base_url: Some(base_url),
        timeout_seconds: 1,
        limit: 2,
        ..SourceConfig::default()
    }
}

#[tokio::test]
async fn test_coingecko_maps_markets() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/coins/markets")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("vs_currency".into(), "usd".into()),
            Matcher::UrlEncoded("order".into(), "market_cap_desc".into()),
            Matcher::UrlEncoded("per_page".into(), "100".into()),
            Matcher::UrlEncoded("sparkline".into(), "true".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(MARKETS_BODY)
        .create_async()
        .await;

    let source = CoinGeckoSource::new(&coingecko_config(server.url())).unwrap();
    let assets = source.fetch_assets(&CancellationToken::new()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(assets.len(), 2);
    assert_eq!(assets[0].id, "bitcoin");
    assert_eq!(assets[0].current_price, 65_000.5);
    assert_eq!(assets[0].sparkline_in_7d.as_ref().unwrap().price.len(), 3);
    assert_eq!(assets[1].market_cap, None);
    assert_eq!(assets[1].price_change_percentage_24h, None);
    assert!(assets[1].image.is_none());
}

#[tokio::test]
async fn test_coingecko_sends_demo_key() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/coins/markets")
        .match_query(Matcher::UrlEncoded("x_cg_demo_api_key".into(), "demo-key".into()))
        .with_status(200)
        .with_body(MARKETS_BODY)
        .create_async()
        .await;

    let mut config = coingecko_config(server.url());
    config.api_key = Some("demo-key".into());
    let source = CoinGeckoSource::new(&config).unwrap();
    assert!(source.fetch_assets(&CancellationToken::new()).await.is_ok());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_status_classification() {
    let mut server = mockito::Server::new_async().await;
    let source = CoinGeckoSource::new(&coingecko_config(server.url())).unwrap();
    let cancel = CancellationToken::new();

    let limited = server
        .mock("GET", "/coins/markets")
        .match_query(Matcher::Any)
        .with_status(429)
        .create_async()
        .await;
    assert_eq!(source.fetch_assets(&cancel).await, Err(FetchError::RateLimited));
    limited.remove_async().await;

    let broken = server
        .mock("GET", "/coins/markets")
        .match_query(Matcher::Any)
        .with_status(502)
        .create_async()
        .await;
    assert_eq!(source.fetch_assets(&cancel).await, Err(FetchError::HttpError(502)));
    broken.remove_async().await;

    server
        .mock("GET", "/coins/markets")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;
    assert!(matches!(
        source.fetch_assets(&cancel).await,
        Err(FetchError::InvalidPayload(_))
    ));
}

#[tokio::test]
async fn test_slow_body_times_out() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/coins/markets")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_chunked_body(|w| {
            std::thread::sleep(Duration::from_millis(2_500));
            w.write_all(b"[]")
        })
        .create_async()
        .await;

    let source = CoinGeckoSource::new(&coingecko_config(server.url())).unwrap();
    let result = source.fetch_assets(&CancellationToken::new()).await;
    assert_eq!(result, Err(FetchError::Timeout(Duration::from_secs(1))));
}

#[tokio::test]
async fn test_unreachable_host_is_network_failure() {
    let source = CoinGeckoSource::new(&coingecko_config("http://127.0.0.1:9".into())).unwrap();
    let result = source.fetch_assets(&CancellationToken::new()).await;
    assert!(matches!(result, Err(FetchError::NetworkFailure(_))));
}

#[tokio::test]
async fn test_cancel_aborts_in_flight_request() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/coins/markets")
        .match_query(Matcher::Any)
        .with_chunked_body(|w| {
            std::thread::sleep(Duration::from_millis(800));
            w.write_all(b"[]")
        })
        .create_async()
        .await;

    let source = CoinGeckoSource::new(&coingecko_config(server.url())).unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    assert_eq!(source.fetch_assets(&cancel).await, Err(FetchError::Aborted));
}

#[tokio::test]
async fn test_binance_maps_tickers() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v3/ticker/24hr")
        .with_status(200)
        .with_body(
            r#"[
              {"symbol":"ETHUSDT","lastPrice":"3100.25","priceChangePercent":"-0.40","quoteVolume":"800000000.0"},
              {"symbol":"BTCUSDT","lastPrice":"65000.50","priceChangePercent":"2.10","quoteVolume":"1500000000.0"},
              {"symbol":"SOLUSDT","lastPrice":"140.00","priceChangePercent":"5.00","quoteVolume":"300000000.0"},
              {"symbol":"ETHBTC","lastPrice":"0.0477","priceChangePercent":"0.1","quoteVolume":"9999999999.0"}
            ]"#,
        )
        .create_async()
        .await;

    let source = BinanceTickerSource::new(&binance_config(server.url())).unwrap();
    let assets = source.fetch_assets(&CancellationToken::new()).await.unwrap();

    mock.assert_async().await;
    let ids: Vec<_> = assets.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, ["bitcoin", "ethereum"]);
    assert_eq!(assets[0].name, "Bitcoin");
    assert_eq!(assets[0].symbol, "btc");
    assert_eq!(assets[0].current_price, 65_000.5);
    assert_eq!(assets[1].price_change_percentage_24h, Some(-0.4));
    assert!(assets.iter().all(|a| a.sparkline_in_7d.is_none()));
}

#[tokio::test]
async fn test_build_source_follows_kind() {
    let gecko = build_source(&SourceConfig::default()).unwrap();
    assert_eq!(gecko.name(), "coingecko");

    let binance = build_source(&binance_config("https://api.binance.com".into())).unwrap();
    assert_eq!(binance.name(), "binance");
}
