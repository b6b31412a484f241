//! Metrics Adapter
//!
//! Prometheus registry for fetch outcomes, retry delay, snapshot size
//! and connectivity. Rendered at `/metrics` by the API router.

pub mod prometheus;

pub use prometheus::MetricsRegistry;
