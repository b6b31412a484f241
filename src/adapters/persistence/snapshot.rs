//! Snapshot File Cache - Atomic JSON Market Snapshot Persistence
//!
//! Saves the last good snapshot to `<data_dir>/<key>` using atomic
//! writes (write to tmp file, then rename), so a crash mid-write leaves
//! either the previous record or the new one, never a partial file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::domain::CacheRecord;
use crate::ports::SnapshotCache;

/// Durable snapshot cache backed by a single JSON file.
pub struct FileSnapshotCache {
    /// Path to the cache file.
    path: PathBuf,
    /// Temporary path for atomic writes.
    tmp_path: PathBuf,
}

impl FileSnapshotCache {
    /// Create a cache in the given data directory under a fixed key.
    ///
    /// Creates the directory if it doesn't exist.
    pub async fn new(data_dir: &str, key: &str) -> Result<Self> {
        let dir = Path::new(data_dir);
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create cache directory: {}", dir.display()))?;

        Ok(Self {
            path: dir.join(key),
            tmp_path: dir.join(format!("{key}.tmp")),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotCache for FileSnapshotCache {
    #[instrument(skip(self))]
    async fn load(&self) -> Result<Option<CacheRecord>> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            debug!(path = %self.path.display(), "No cached snapshot found");
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path)
            .await
            .context("Failed to read cache file")?;

        let record: CacheRecord =
            serde_json::from_str(&json).context("Failed to parse cached snapshot")?;

        debug!(
            assets = record.assets.len(),
            timestamp_ms = record.timestamp_ms,
            "Cached snapshot loaded"
        );

        Ok(Some(record))
    }

    #[instrument(skip(self, record), fields(assets = record.assets.len()))]
    async fn store(&self, record: &CacheRecord) -> Result<()> {
        let json = serde_json::to_string(record).context("Failed to serialize snapshot")?;

        fs::write(&self.tmp_path, &json)
            .await
            .context("Failed to write tmp cache file")?;

        fs::rename(&self.tmp_path, &self.path)
            .await
            .context("Failed to rename cache file")?;

        info!(path = %self.path.display(), "Snapshot cached");

        Ok(())
    }
}
