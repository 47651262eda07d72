// src/store/memory.rs
use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{apply_upserts, EarthquakeStore, PersistedEarthquake, UpsertCounts};
use crate::error::StoreError;

/// In-process store. A batch is applied under one write guard, so
/// readers never see it half-applied.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<BTreeMap<String, PersistedEarthquake>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EarthquakeStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn upsert(&self, quake: PersistedEarthquake) -> Result<UpsertCounts, StoreError> {
        self.upsert_batch(vec![quake]).await
    }

    async fn upsert_batch(&self, quakes: Vec<PersistedEarthquake>) -> Result<UpsertCounts, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        Ok(apply_upserts(&mut map, quakes))
    }

    async fn replace_all(&self, quakes: Vec<PersistedEarthquake>) -> Result<usize, StoreError> {
        let mut fresh = BTreeMap::new();
        apply_upserts(&mut fresh, quakes);
        let n = fresh.len();
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        *map = fresh;
        Ok(n)
    }

    async fn delete_all(&self) -> Result<usize, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let n = map.len();
        map.clear();
        Ok(n)
    }

    async fn scan_all(&self) -> Result<Vec<PersistedEarthquake>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.values().cloned().collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.len())
    }
}
