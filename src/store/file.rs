// src/store/file.rs
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{apply_upserts, EarthquakeStore, PersistedEarthquake, UpsertCounts};
use crate::atomic_file::write_atomic;
use crate::error::StoreError;

/// JSON-file backed store.
///
/// Reads are served from an in-memory snapshot. A write builds the next
/// snapshot, persists it with write-temp-then-rename, and only then swaps it
/// in; if persisting fails the previous state stays fully intact.
pub struct JsonFileStore {
    path: PathBuf,
    snapshot: RwLock<BTreeMap<String, PersistedEarthquake>>,
    writer: Mutex<()>,
}

impl JsonFileStore {
    /// Open `path`, loading existing records if the file is present.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut map = BTreeMap::new();
        match tokio::fs::read(&path).await {
            Ok(bytes) if !bytes.is_empty() => {
                let rows: Vec<PersistedEarthquake> = serde_json::from_slice(&bytes)?;
                apply_upserts(&mut map, rows);
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tracing::info!(path = %path.display(), records = map.len(), "opened earthquake store");
        Ok(Self {
            path,
            snapshot: RwLock::new(map),
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn current(&self) -> Result<BTreeMap<String, PersistedEarthquake>, StoreError> {
        Ok(self.snapshot.read().map_err(|_| StoreError::Poisoned)?.clone())
    }

    async fn commit(&self, next: BTreeMap<String, PersistedEarthquake>) -> Result<(), StoreError> {
        let bytes = {
            let rows: Vec<&PersistedEarthquake> = next.values().collect();
            serde_json::to_vec(&rows)?
        };
        write_atomic(&self.path, &bytes).await?;
        *self.snapshot.write().map_err(|_| StoreError::Poisoned)? = next;
        Ok(())
    }
}

#[async_trait]
impl EarthquakeStore for JsonFileStore {
    fn name(&self) -> &'static str {
        "json-file"
    }

    async fn upsert(&self, quake: PersistedEarthquake) -> Result<UpsertCounts, StoreError> {
        self.upsert_batch(vec![quake]).await
    }

    async fn upsert_batch(&self, quakes: Vec<PersistedEarthquake>) -> Result<UpsertCounts, StoreError> {
        let _guard = self.writer.lock().await;
        let mut next = self.current()?;
        let counts = apply_upserts(&mut next, quakes);
        self.commit(next).await?;
        Ok(counts)
    }

    async fn replace_all(&self, quakes: Vec<PersistedEarthquake>) -> Result<usize, StoreError> {
        let _guard = self.writer.lock().await;
        let mut next = BTreeMap::new();
        apply_upserts(&mut next, quakes);
        let n = next.len();
        self.commit(next).await?;
        Ok(n)
    }

    async fn delete_all(&self) -> Result<usize, StoreError> {
        let _guard = self.writer.lock().await;
        let n = self.current()?.len();
        self.commit(BTreeMap::new()).await?;
        Ok(n)
    }

    async fn scan_all(&self) -> Result<Vec<PersistedEarthquake>, StoreError> {
        let map = self.snapshot.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.values().cloned().collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.snapshot.read().map_err(|_| StoreError::Poisoned)?.len())
    }
}
