//! Integration Tests - Supervisor Behavior End to End
//!
//! Drives the market data supervisor through mocked ports (mockall) and
//! the background refresh loop on a paused tokio clock, so retry delays
//! of minutes run instantly and deterministically.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use mockall::mock;
use tokio_util::sync::CancellationToken;

use coinwatch::adapters::connectivity::ManualConnectivity;
use coinwatch::adapters::metrics::MetricsRegistry;
use coinwatch::adapters::persistence::MemoryCache;
use coinwatch::domain::{Asset, CacheRecord, FetchError, FetchResult, fallback_assets};
use coinwatch::ports::{AssetDataSource, SnapshotCache};
use coinwatch::usecases::{
    CycleEnd, CycleKind, MarketDataSupervisor, SupervisorHandle, SupervisorSettings,
};

// ---- Mock Definitions ----

mock! {
    pub Source {}

    #[async_trait::async_trait]
    impl AssetDataSource for Source {
        async fn fetch_assets(&self, cancel: &CancellationToken) -> FetchResult<Vec<Asset>>;
        fn name(&self) -> &'static str;
    }
}

mock! {
    pub Cache {}

    #[async_trait::async_trait]
    impl SnapshotCache for Cache {
        async fn load(&self) -> anyhow::Result<Option<CacheRecord>>;
        async fn store(&self, record: &CacheRecord) -> anyhow::Result<()>;
    }
}

// ---- Fixtures ----

fn asset(id: &str, price: f64, change: Option<f64>) -> Asset {
    Asset {
        id: id.to_string(),
        symbol: id.chars().take(3).collect(),
        name: format!("{id} coin"),
        image: None,
        current_price: price,
        market_cap: Some(price * 1_000.0),
        price_change_percentage_24h: change,
        sparkline_in_7d: None,
    }
}

fn live_assets() -> Vec<Asset> {
    vec![
        asset("bitcoin", 65_000.0, Some(2.1)),
        asset("ethereum", 3_100.0, Some(-0.4)),
        asset("solana", 140.0, Some(5.0)),
    ]
}

fn mock_source(results: Vec<FetchResult<Vec<Asset>>>) -> MockSource {
    let script = Mutex::new(VecDeque::from(results));
    let mut source = MockSource::new();
    source.expect_name().return_const("mock");
    source.expect_fetch_assets().returning(move |_| {
        script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::NetworkFailure("unscripted call".into())))
    });
    source
}

fn empty_cache() -> MockCache {
    let mut cache = MockCache::new();
    cache.expect_load().returning(|| Ok(None));
    cache.expect_store().returning(|_| Ok(()));
    cache
}

async fn supervisor(source: MockSource, cache: MockCache) -> MarketDataSupervisor {
    MarketDataSupervisor::new(Arc::new(source), Arc::new(cache), SupervisorSettings::default())
        .await
}

// ---- Supervisor Scenarios ----

#[tokio::test]
async fn test_first_fetch_success_persists_snapshot() {
    let mut cache = MockCache::new();
    cache.expect_load().times(1).returning(|| Ok(None));
    cache
        .expect_store()
        .withf(|record| record.assets.len() == 3 && record.timestamp_ms > 0)
        .times(1)
        .returning(|_| Ok(()));

    let mut sup = supervisor(mock_source(vec![Ok(live_assets())]), cache).await;
    let end = sup.run_cycle(CycleKind::Foreground).await;

    let CycleEnd::Completed(report) = end else {
        panic!("cycle should complete");
    };
    assert!(report.error.is_none());
    assert_eq!(report.next_delay, Duration::from_secs(60));

    let state = sup.state();
    assert_eq!(state.assets, live_assets());
    assert!(!state.is_loading);
    assert!(state.error.is_none());
    assert!(state.last_updated.is_some());
}

#[tokio::test]
async fn test_failure_keeps_fresh_cached_snapshot() {
    let cached = CacheRecord::new(live_assets(), Utc::now() - chrono::Duration::minutes(2));
    let mut cache = MockCache::new();
    cache.expect_load().returning(move || Ok(Some(cached.clone())));
    cache.expect_store().never();

    let mut sup = supervisor(mock_source(vec![Err(FetchError::HttpError(503))]), cache).await;
    assert_eq!(sup.state().assets, live_assets());

    sup.run_cycle(CycleKind::Foreground).await;
    let state = sup.state();
    assert_eq!(state.assets, live_assets());
    assert!(state.error.as_deref().unwrap().contains("503"));
    assert_eq!(sup.retry_delay(), Duration::from_secs(120));
}

#[tokio::test]
async fn test_expired_cache_falls_back_to_hardcoded_set() {
    let expired = CacheRecord::new(live_assets(), Utc::now() - chrono::Duration::minutes(10));
    let mut cache = MockCache::new();
    cache.expect_load().returning(move || Ok(Some(expired.clone())));

    let timeout = FetchError::Timeout(Duration::from_secs(15));
    let mut sup = supervisor(mock_source(vec![Err(timeout.clone())]), cache).await;
    assert!(sup.state().assets.is_empty());

    sup.run_cycle(CycleKind::Foreground).await;
    let state = sup.state();
    assert_eq!(state.assets, fallback_assets());
    assert_eq!(state.error, Some(timeout.user_message()));
}

#[tokio::test]
async fn test_cache_write_failure_does_not_fail_cycle() {
    let mut cache = MockCache::new();
    cache.expect_load().returning(|| Ok(None));
    cache
        .expect_store()
        .times(1)
        .returning(|_| Err(anyhow::anyhow!("disk full")));

    let mut sup = supervisor(mock_source(vec![Ok(live_assets())]), cache).await;
    sup.run_cycle(CycleKind::Foreground).await;

    assert_eq!(sup.state().assets, live_assets());
    assert!(sup.state().error.is_none());
}

#[tokio::test]
async fn test_cache_read_failure_is_treated_as_empty() {
    let mut cache = MockCache::new();
    cache
        .expect_load()
        .returning(|| Err(anyhow::anyhow!("corrupt cache")));

    let mut sup = supervisor(mock_source(vec![Err(FetchError::RateLimited)]), cache).await;
    sup.run_cycle(CycleKind::Foreground).await;

    assert_eq!(sup.state().assets, fallback_assets());
}

#[tokio::test]
async fn test_backoff_sequence_across_failures() {
    let mut sup = supervisor(
        mock_source(vec![
            Err(FetchError::NetworkFailure("dns".into())),
            Err(FetchError::HttpError(500)),
            Err(FetchError::InvalidPayload("bad json".into())),
            Err(FetchError::RateLimited),
            Ok(live_assets()),
        ]),
        empty_cache(),
    )
    .await;

    let mut delays = Vec::new();
    for _ in 0..5 {
        if let CycleEnd::Completed(report) = sup.run_cycle(CycleKind::Background).await {
            delays.push(report.next_delay.as_secs());
        }
    }
    assert_eq!(delays, [120, 240, 300, 300, 60]);
}

#[tokio::test]
async fn test_success_after_failure_clears_error() {
    let mut sup = supervisor(
        mock_source(vec![Err(FetchError::HttpError(500)), Ok(live_assets())]),
        empty_cache(),
    )
    .await;

    sup.run_cycle(CycleKind::Foreground).await;
    assert!(sup.state().error.is_some());
    assert_eq!(sup.state().assets, fallback_assets());

    sup.run_cycle(CycleKind::Background).await;
    assert!(sup.state().error.is_none());
    assert_eq!(sup.state().assets, live_assets());
}

// ---- Refresh Loop (paused clock) ----

/// Source that counts calls and replays a script, then succeeds forever.
struct CountingSource {
    calls: AtomicUsize,
    script: Mutex<VecDeque<FetchResult<Vec<Asset>>>>,
}

impl CountingSource {
    fn new(script: Vec<FetchResult<Vec<Asset>>>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            script: Mutex::new(script.into()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetDataSource for CountingSource {
    async fn fetch_assets(&self, _cancel: &CancellationToken) -> FetchResult<Vec<Asset>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(live_assets()))
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// Source whose calls each take a scripted time before answering.
struct DelayedSource {
    calls: AtomicUsize,
    script: Mutex<VecDeque<(Duration, Vec<Asset>)>>,
}

impl DelayedSource {
    fn new(script: Vec<(Duration, Vec<Asset>)>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            script: Mutex::new(script.into()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetDataSource for DelayedSource {
    async fn fetch_assets(&self, _cancel: &CancellationToken) -> FetchResult<Vec<Asset>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let Some((delay, assets)) = next else {
            return Ok(live_assets());
        };
        tokio::time::sleep(delay).await;
        Ok(assets)
    }

    fn name(&self) -> &'static str {
        "delayed"
    }
}

async fn spawn_handle<S: AssetDataSource>(
    source: Arc<S>,
    connectivity: &ManualConnectivity,
) -> SupervisorHandle {
    let supervisor = MarketDataSupervisor::new(
        source,
        Arc::new(MemoryCache::new()),
        SupervisorSettings::default(),
    )
    .await;
    SupervisorHandle::spawn(supervisor, connectivity, None)
}

/// Let the refresh loop and spawned fetches run to quiescence.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_background_refresh_after_initial_delay() {
    let source = CountingSource::new(vec![]);
    let online = ManualConnectivity::new(true);
    let handle = spawn_handle(Arc::clone(&source), &online).await;

    settle().await;
    assert_eq!(source.calls(), 1);
    assert_eq!(handle.state().assets, live_assets());

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert_eq!(source.calls(), 1);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(source.calls(), 2);

    handle.dispose().await;
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_waits_max_delay() {
    let source = CountingSource::new(vec![Err(FetchError::RateLimited)]);
    let online = ManualConnectivity::new(true);
    let handle = spawn_handle(Arc::clone(&source), &online).await;

    settle().await;
    assert_eq!(source.calls(), 1);
    assert_eq!(handle.state().assets, fallback_assets());
    assert!(handle.state().error.as_deref().unwrap().contains("rate-limiting"));

    tokio::time::sleep(Duration::from_secs(298)).await;
    assert_eq!(source.calls(), 1);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(source.calls(), 2);
    assert_eq!(handle.state().assets, live_assets());
    assert!(handle.state().error.is_none());

    handle.dispose().await;
}

#[tokio::test(start_paused = true)]
async fn test_manual_refresh_is_coalesced() {
    let source = CountingSource::new(vec![]);
    let online = ManualConnectivity::new(true);
    let handle = spawn_handle(Arc::clone(&source), &online).await;
    settle().await;
    assert_eq!(source.calls(), 1);

    handle.refresh();
    handle.refresh();
    handle.refresh();
    settle().await;
    assert_eq!(source.calls(), 2);

    handle.dispose().await;
}

#[tokio::test(start_paused = true)]
async fn test_offline_start_then_reconnect() {
    let source = CountingSource::new(vec![]);
    let connectivity = ManualConnectivity::new(false);
    let handle = spawn_handle(Arc::clone(&source), &connectivity).await;

    settle().await;
    assert_eq!(source.calls(), 0);
    let state = handle.state();
    assert_eq!(state.assets, fallback_assets());
    assert_eq!(state.error, Some(FetchError::Offline.user_message()));

    // Offline timers never reach the network.
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(source.calls(), 0);

    connectivity.set_online(true);
    settle().await;
    assert_eq!(source.calls(), 1);
    assert_eq!(handle.state().assets, live_assets());
    assert!(handle.state().error.is_none());

    handle.dispose().await;
}

#[tokio::test(start_paused = true)]
async fn test_going_offline_stops_timer() {
    let source = CountingSource::new(vec![]);
    let connectivity = ManualConnectivity::new(true);
    let handle = spawn_handle(Arc::clone(&source), &connectivity).await;
    settle().await;
    assert_eq!(source.calls(), 1);

    connectivity.set_online(false);
    settle().await;
    assert_eq!(handle.state().error, Some(FetchError::Offline.user_message()));
    assert_eq!(handle.state().assets, live_assets());

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(source.calls(), 1);

    handle.dispose().await;
}

#[tokio::test(start_paused = true)]
async fn test_offline_during_first_fetch_substitutes_fallback() {
    let source = DelayedSource::new(vec![(Duration::from_secs(10), live_assets())]);
    let connectivity = ManualConnectivity::new(true);
    let handle = spawn_handle(Arc::clone(&source), &connectivity).await;

    settle().await;
    assert_eq!(source.calls(), 1);
    assert!(handle.state().is_loading);
    assert!(handle.state().assets.is_empty());

    connectivity.set_online(false);
    settle().await;
    let state = handle.state();
    assert_eq!(state.assets, fallback_assets());
    assert!(!state.is_loading);
    assert_eq!(state.error, Some(FetchError::Offline.user_message()));

    // The cancelled request never lands and offline timers stay off the network.
    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(source.calls(), 1);
    assert_eq!(handle.state().assets, fallback_assets());

    handle.dispose().await;
}

#[tokio::test(start_paused = true)]
async fn test_refresh_supersedes_in_flight_fetch() {
    let stale = vec![asset("stale", 1.0, Some(0.0))];
    let source = DelayedSource::new(vec![
        (Duration::from_secs(10), stale.clone()),
        (Duration::from_millis(100), live_assets()),
    ]);
    let online = ManualConnectivity::new(true);
    let metrics = Arc::new(MetricsRegistry::new().unwrap());
    let supervisor = MarketDataSupervisor::new(
        Arc::clone(&source) as Arc<dyn AssetDataSource>,
        Arc::new(MemoryCache::new()),
        SupervisorSettings::default(),
    )
    .await;
    let handle = SupervisorHandle::spawn(supervisor, &online, Some(Arc::clone(&metrics)));

    let mut updates = handle.subscribe();
    let published = tokio::spawn(async move {
        let mut seen = Vec::new();
        while updates.changed().await.is_ok() {
            seen.push(updates.borrow_and_update().assets.clone());
        }
        seen
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(source.calls(), 1);
    handle.refresh();
    settle().await;
    assert_eq!(source.calls(), 2);

    // Well past the point where the first request would have answered.
    tokio::time::sleep(Duration::from_secs(20)).await;
    let state = handle.state();
    assert_eq!(state.assets, live_assets());
    assert!(!state.is_loading);
    assert_eq!(source.calls(), 2);
    assert_eq!(metrics.fetch_outcomes.with_label_values(&["delayed", "success"]).get(), 1);

    handle.dispose().await;
    let seen = published.await.unwrap();
    assert!(seen.iter().all(|assets| *assets != stale));
    assert_eq!(seen.last(), Some(&live_assets()));
}

#[tokio::test(start_paused = true)]
async fn test_dispose_stops_everything() {
    let source = CountingSource::new(vec![]);
    let online = ManualConnectivity::new(true);
    let handle = spawn_handle(Arc::clone(&source), &online).await;
    settle().await;

    handle.dispose().await;
    assert!(handle.is_disposed());
    let frozen = handle.state();

    handle.refresh();
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(source.calls(), 1);
    assert_eq!(handle.state(), frozen);
}

#[tokio::test(start_paused = true)]
async fn test_metrics_record_cycles() {
    let source = CountingSource::new(vec![Err(FetchError::HttpError(500))]);
    let online = ManualConnectivity::new(true);
    let metrics = Arc::new(MetricsRegistry::new().unwrap());
    let supervisor = MarketDataSupervisor::new(
        Arc::clone(&source) as Arc<dyn AssetDataSource>,
        Arc::new(MemoryCache::new()),
        SupervisorSettings::default(),
    )
    .await;
    let handle = SupervisorHandle::spawn(supervisor, &online, Some(Arc::clone(&metrics)));

    settle().await;
    assert_eq!(
        metrics.fetch_outcomes.with_label_values(&["counting", "http_error"]).get(),
        1
    );
    assert_eq!(metrics.retry_delay_seconds.get(), 120);
    assert_eq!(metrics.online.get(), 1);

    tokio::time::sleep(Duration::from_secs(121)).await;
    assert_eq!(metrics.fetch_outcomes.with_label_values(&["counting", "success"]).get(), 1);
    assert_eq!(metrics.asset_count.get(), 3);

    handle.dispose().await;
}
