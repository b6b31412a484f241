//! Snapshot Cache Port - Durable Last-Known-Good Storage
//!
//! A single `{assets, timestamp}` record under a fixed key. The
//! adapter stores and returns it verbatim; expiry is decided by the
//! supervisor against its configured TTL.

use async_trait::async_trait;

use crate::domain::CacheRecord;

#[async_trait]
pub trait SnapshotCache: Send + Sync + 'static {
  /// Read the stored record, `None` if nothing was ever written.
  async fn load(&self) -> anyhow::Result<Option<CacheRecord>>;

  /// Replace the stored record.
  async fn store(&self, record: &CacheRecord) -> anyhow::Result<()>;
}
