//! Domain layer - Market data types and pure logic.
//!
//! No I/O here (hexagonal architecture inner ring): asset model, fetch
//! error taxonomy, retry backoff, fallback snapshot and derived views.
//! All types are serializable and testable in isolation.

pub mod asset;
pub mod backoff;
pub mod error;
pub mod fallback;
pub mod views;

// Re-export core types for convenience
pub use asset::{Asset, AssetId, CacheRecord, Sparkline, Trend};
pub use backoff::RetryBackoff;
pub use error::{FetchError, FetchResult};
pub use fallback::fallback_assets;
pub use views::{FilterMode, SortConfig, SortDirection, SortKey, TableQuery, TickerEntry};
