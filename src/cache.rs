//! Snapshot cache - last-resort fallback data for degraded mode.
//!
//! A single serialized snapshot of the last successfully fetched record
//! list, read at startup-degradation time and written after every
//! successful full fetch. The format is an implementation detail, not a
//! compatibility surface; concurrent writers are not anticipated and
//! last-write-wins is acceptable.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::CacheError;
use crate::record::RawRecord;

/// Fixed cache file name used when no explicit path is configured
pub const DEFAULT_CACHE_FILE: &str = "vitrine-snapshot.json";

/// The persisted snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub saved_at: DateTime<Utc>,
    pub records: Vec<RawRecord>,
}

impl Snapshot {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self {
            saved_at: Utc::now(),
            records,
        }
    }
}

/// Opaque persisted snapshot storage
#[async_trait]
pub trait SnapshotCache: Send + Sync {
    /// Load the last snapshot, `None` when no snapshot exists yet
    async fn load(&self) -> Result<Option<Snapshot>, CacheError>;

    /// Persist a snapshot, replacing any previous one
    async fn store(&self, snapshot: &Snapshot) -> Result<(), CacheError>;
}

/// JSON file-backed snapshot cache
pub struct FileSnapshotCache {
    path: PathBuf,
}

impl FileSnapshotCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotCache for FileSnapshotCache {
    async fn load(&self) -> Result<Option<Snapshot>, CacheError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::Io(e)),
        }
    }

    async fn store(&self, snapshot: &Snapshot) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(snapshot)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

/// In-memory snapshot cache for testing
pub struct MemorySnapshotCache {
    slot: RwLock<Option<Snapshot>>,
}

impl MemorySnapshotCache {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Preload a snapshot, as if a previous session had written one
    pub async fn preload(&self, snapshot: Snapshot) {
        *self.slot.write().await = Some(snapshot);
    }
}

impl Default for MemorySnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotCache for MemorySnapshotCache {
    async fn load(&self) -> Result<Option<Snapshot>, CacheError> {
        Ok(self.slot.read().await.clone())
    }

    async fn store(&self, snapshot: &Snapshot) -> Result<(), CacheError> {
        *self.slot.write().await = Some(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> Vec<RawRecord> {
        vec![RawRecord {
            id: "a".to_string(),
            zone: Some("gallery".to_string()),
            title: "Fade".to_string(),
            description: None,
            media_url: Some("https://cdn.example.com/fade.jpg".to_string()),
            active: true,
            created_at: None,
            owner_tag: Some("admin".to_string()),
        }]
    }

    #[tokio::test]
    async fn test_file_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileSnapshotCache::new(dir.path().join(DEFAULT_CACHE_FILE));

        assert!(cache.load().await.unwrap().is_none());

        cache.store(&Snapshot::new(sample_records())).await.unwrap();
        let loaded = cache.load().await.unwrap().expect("snapshot present");
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.records[0].id, "a");
    }

    #[tokio::test]
    async fn test_file_cache_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileSnapshotCache::new(dir.path().join(DEFAULT_CACHE_FILE));

        cache.store(&Snapshot::new(sample_records())).await.unwrap();
        cache.store(&Snapshot::new(Vec::new())).await.unwrap();

        let loaded = cache.load().await.unwrap().unwrap();
        assert!(loaded.records.is_empty());
    }

    #[tokio::test]
    async fn test_memory_cache() {
        let cache = MemorySnapshotCache::new();
        assert!(cache.load().await.unwrap().is_none());
        cache.preload(Snapshot::new(sample_records())).await;
        assert_eq!(cache.load().await.unwrap().unwrap().records.len(), 1);
    }
}
