//! Queue entry persistence
//!
//! `FileQueueRepository` keeps one JSON document per entry under a data
//! directory, written on every status change, so the queue survives process
//! restarts. `MemoryQueueRepository` backs tests and throwaway runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::EngineResult;
use crate::traits::QueueRepository;
use shared::{EntryId, QueueEntry};

/// One JSON file per queue entry under a data directory
pub struct FileQueueRepository {
    dir: PathBuf,
}

impl FileQueueRepository {
    /// Open (and create if missing) the data directory.
    pub async fn open(dir: impl Into<PathBuf>) -> EngineResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn entry_path(&self, id: EntryId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn read_entry(path: &Path) -> EngineResult<QueueEntry> {
        let bytes = fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl QueueRepository for FileQueueRepository {
    async fn load_all(&self) -> EngineResult<Vec<QueueEntry>> {
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&self.dir).await?;

        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            match Self::read_entry(&path).await {
                Ok(entry) => entries.push(entry),
                // A corrupt file must not take the whole queue down.
                Err(e) => warn!("skipping unreadable queue file {}: {e}", path.display()),
            }
        }
        Ok(entries)
    }

    async fn persist(&self, entry: &QueueEntry) -> EngineResult<()> {
        let path = self.entry_path(entry.id);
        let json = serde_json::to_vec_pretty(entry)?;

        // Write-then-rename so a crash mid-write never corrupts the entry.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// Volatile repository for tests and one-off runs
#[derive(Default)]
pub struct MemoryQueueRepository {
    entries: Mutex<HashMap<EntryId, QueueEntry>>,
}

impl MemoryQueueRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed entries before the store is opened, simulating prior state.
    pub async fn seed(&self, entries: Vec<QueueEntry>) {
        let mut map = self.entries.lock().await;
        for entry in entries {
            map.insert(entry.id, entry);
        }
    }
}

#[async_trait]
impl QueueRepository for MemoryQueueRepository {
    async fn load_all(&self) -> EngineResult<Vec<QueueEntry>> {
        Ok(self.entries.lock().await.values().cloned().collect())
    }

    async fn persist(&self, entry: &QueueEntry) -> EngineResult<()> {
        self.entries.lock().await.insert(entry.id, entry.clone());
        Ok(())
    }
}
