//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the supervisor requires from
//! the outside world. Adapters implement these traits and are injected,
//! so tests drive the supervisor with mocks instead of real I/O.
//!
//! Port categories:
//! - `AssetDataSource`: upstream market data (one request per call)
//! - `SnapshotCache`: durable last-known-good snapshot
//! - `ConnectivitySignal`: online/offline transitions

pub mod cache;
pub mod connectivity;
pub mod data_source;

pub use cache::SnapshotCache;
pub use connectivity::ConnectivitySignal;
pub use data_source::AssetDataSource;
