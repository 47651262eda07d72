// src/store/mod.rs
//! Persisted earthquake storage.
//!
//! Every write operation is atomic with respect to readers: a `scan_all`
//! observes either the state before a batch or after it.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::ingest::types::EventRecord;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Stored counterpart of an `EventRecord`, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedEarthquake {
    pub id: String,
    pub source: String,
    pub magnitude: Option<f64>,
    pub magnitude_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub depth: f64,
    pub place: String,
    pub origin_time: i64,
    pub utc_time: String,
    pub title: String,
    pub event_type: String,
}

impl From<&EventRecord> for PersistedEarthquake {
    fn from(r: &EventRecord) -> Self {
        Self {
            id: r.id.clone(),
            source: r.source.clone(),
            magnitude: r.magnitude,
            magnitude_type: r.magnitude_type.clone(),
            latitude: r.latitude,
            longitude: r.longitude,
            depth: r.depth,
            place: r.place.clone(),
            origin_time: r.origin_time,
            utc_time: r.utc_time.clone(),
            title: r.title.clone(),
            event_type: r.event_type.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct UpsertCounts {
    pub inserted: usize,
    pub updated: usize,
}

impl UpsertCounts {
    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }
}

#[async_trait]
pub trait EarthquakeStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Insert or fully overwrite one record.
    async fn upsert(&self, quake: PersistedEarthquake) -> Result<UpsertCounts, StoreError>;

    /// Insert-or-overwrite a whole batch as one atomic step.
    async fn upsert_batch(&self, quakes: Vec<PersistedEarthquake>) -> Result<UpsertCounts, StoreError>;

    /// Clear and reload as one atomic step. Returns the new record count.
    async fn replace_all(&self, quakes: Vec<PersistedEarthquake>) -> Result<usize, StoreError>;

    /// Returns how many records were removed.
    async fn delete_all(&self) -> Result<usize, StoreError>;

    /// Every stored record, ordered by id. No pagination ceiling.
    async fn scan_all(&self) -> Result<Vec<PersistedEarthquake>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.scan_all().await?.len())
    }
}

/// Apply a batch to an id-keyed map, counting inserts vs overwrites.
pub(crate) fn apply_upserts(
    map: &mut std::collections::BTreeMap<String, PersistedEarthquake>,
    quakes: Vec<PersistedEarthquake>,
) -> UpsertCounts {
    let mut counts = UpsertCounts::default();
    for q in quakes {
        match map.insert(q.id.clone(), q) {
            Some(_) => counts.updated += 1,
            None => counts.inserted += 1,
        }
    }
    counts
}
