//! In-memory snapshot cache.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::CacheRecord;
use crate::ports::SnapshotCache;

/// Process-local cache. Lost on restart.
#[derive(Default)]
pub struct MemoryCache {
    record: RwLock<Option<CacheRecord>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache pre-populated with a record.
    pub fn with_record(record: CacheRecord) -> Self {
        Self {
            record: RwLock::new(Some(record)),
        }
    }
}

#[async_trait]
impl SnapshotCache for MemoryCache {
    async fn load(&self) -> Result<Option<CacheRecord>> {
        Ok(self.record.read().await.clone())
    }

    async fn store(&self, record: &CacheRecord) -> Result<()> {
        *self.record.write().await = Some(record.clone());
        Ok(())
    }
}
