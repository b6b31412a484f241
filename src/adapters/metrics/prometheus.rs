//! Prometheus Metrics Registry - Market Data Observability
//!
//! Registers the `coinwatch_*` metrics and renders them in the text
//! exposition format. Updated by the refresh loop after every cycle.

use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::usecases::{CycleReport, MarketState};

/// Centralized Prometheus metrics for the supervisor.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Completed cycles by source and outcome (`success`, `rate_limited`, ...).
    pub fetch_outcomes: IntCounterVec,
    /// Results discarded because a newer request replaced them.
    pub fetches_superseded: IntCounter,
    /// Delay before the next background cycle (seconds).
    pub retry_delay_seconds: IntGauge,
    /// Assets in the published snapshot set.
    pub asset_count: IntGauge,
    /// Connectivity status (1 = online, 0 = offline).
    pub online: IntGauge,
    /// Unix time of the last successful fetch.
    pub last_success_timestamp: Gauge,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let fetch_outcomes = IntCounterVec::new(
            Opts::new("coinwatch_fetch_outcomes_total", "Completed fetch cycles by outcome"),
            &["source", "outcome"],
        )?;

        let fetches_superseded = IntCounter::new(
            "coinwatch_fetches_superseded_total",
            "Fetch results discarded after being superseded",
        )?;

        let retry_delay_seconds = IntGauge::new(
            "coinwatch_retry_delay_seconds",
            "Delay before the next background refresh",
        )?;

        let asset_count = IntGauge::new(
            "coinwatch_asset_count",
            "Assets in the published snapshot set",
        )?;

        let online = IntGauge::new(
            "coinwatch_online",
            "Connectivity status (1=online, 0=offline)",
        )?;

        let last_success_timestamp = Gauge::new(
            "coinwatch_last_success_timestamp_seconds",
            "Unix time of the last successful fetch",
        )?;

        registry.register(Box::new(fetch_outcomes.clone()))?;
        registry.register(Box::new(fetches_superseded.clone()))?;
        registry.register(Box::new(retry_delay_seconds.clone()))?;
        registry.register(Box::new(asset_count.clone()))?;
        registry.register(Box::new(online.clone()))?;
        registry.register(Box::new(last_success_timestamp.clone()))?;

        Ok(Self {
            registry,
            fetch_outcomes,
            fetches_superseded,
            retry_delay_seconds,
            asset_count,
            online,
            last_success_timestamp,
        })
    }

    /// Record a completed cycle and the state it produced.
    pub fn record_cycle(&self, source: &str, report: &CycleReport, state: &MarketState) {
        let outcome = report.error.as_ref().map_or("success", |e| e.outcome_label());
        self.fetch_outcomes.with_label_values(&[source, outcome]).inc();
        self.retry_delay_seconds
            .set(i64::try_from(report.next_delay.as_secs()).unwrap_or(i64::MAX));
        self.asset_count
            .set(i64::try_from(state.assets.len()).unwrap_or(i64::MAX));

        if report.error.is_none() {
            if let Some(at) = state.last_updated {
                #[allow(clippy::cast_precision_loss)]
                self.last_success_timestamp.set(at.timestamp_millis() as f64 / 1_000.0);
            }
        }
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
