//! Persistence Adapters - Snapshot Cache Storage
//!
//! Implements the `SnapshotCache` port with an atomic JSON file under
//! the configured data directory, plus an in-memory variant for tests
//! and cache-disabled deployments. A single fixed key is used; there is
//! no history.

pub mod memory;
pub mod snapshot;

pub use memory::MemoryCache;
pub use snapshot::FileSnapshotCache;
