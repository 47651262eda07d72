// tests/common/mod.rs
// Test doubles shared by the pipeline and HTTP tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use quakes_near_me::error::{FetchError, StoreError};
use quakes_near_me::ingest::providers;
use quakes_near_me::ingest::types::{Normalized, RawPayload, SourceAdapter, TimeWindow};
use quakes_near_me::store::{EarthquakeStore, PersistedEarthquake, UpsertCounts};

pub fn usgs_fixture() -> RawPayload {
    RawPayload::Json(serde_json::from_str(include_str!("../fixtures/usgs.geojson")).unwrap())
}

pub fn emsc_fixture() -> RawPayload {
    RawPayload::Json(serde_json::from_str(include_str!("../fixtures/emsc.json")).unwrap())
}

pub fn knmi_fixture() -> RawPayload {
    RawPayload::Text(include_str!("../fixtures/knmi.txt").to_string())
}

/// Serves a canned payload through a real feed normalizer.
pub struct CannedAdapter {
    pub id: &'static str,
    pub payload: RawPayload,
    pub delay: Duration,
    pub timeout: Duration,
    pub calls: Arc<AtomicUsize>,
    pub in_flight: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
}

impl CannedAdapter {
    pub fn new(id: &'static str, payload: RawPayload) -> Self {
        Self {
            id,
            payload,
            delay: Duration::ZERO,
            timeout: Duration::from_secs(5),
            calls: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_delay(mut self, delay: Duration, timeout: Duration) -> Self {
        self.delay = delay;
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl SourceAdapter for CannedAdapter {
    fn source_id(&self) -> &'static str {
        self.id
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, _window: &TimeWindow) -> Result<RawPayload, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.payload.clone())
    }

    fn normalize(&self, raw: RawPayload) -> Normalized {
        match self.id {
            "emsc" => providers::emsc::normalize(&raw),
            "knmi" => providers::knmi::normalize(&raw),
            "resif" => providers::resif::normalize(&raw),
            "sed" => providers::sed::normalize(&raw),
            _ => providers::usgs::normalize(&raw),
        }
    }
}

/// Always answers with a transport failure.
pub struct DownAdapter(pub &'static str);

#[async_trait]
impl SourceAdapter for DownAdapter {
    fn source_id(&self) -> &'static str {
        self.0
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn fetch(&self, _window: &TimeWindow) -> Result<RawPayload, FetchError> {
        Err(FetchError::Transport("connection refused".into()))
    }

    fn normalize(&self, raw: RawPayload) -> Normalized {
        providers::usgs::normalize(&raw)
    }
}

/// Store whose every operation fails.
pub struct BrokenStore;

#[async_trait]
impl EarthquakeStore for BrokenStore {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn upsert(&self, _q: PersistedEarthquake) -> Result<UpsertCounts, StoreError> {
        Err(StoreError::Unavailable("disk on fire".into()))
    }

    async fn upsert_batch(&self, _q: Vec<PersistedEarthquake>) -> Result<UpsertCounts, StoreError> {
        Err(StoreError::Unavailable("disk on fire".into()))
    }

    async fn replace_all(&self, _q: Vec<PersistedEarthquake>) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("disk on fire".into()))
    }

    async fn delete_all(&self) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("disk on fire".into()))
    }

    async fn scan_all(&self) -> Result<Vec<PersistedEarthquake>, StoreError> {
        Err(StoreError::Unavailable("disk on fire".into()))
    }
}

pub fn boxed(a: impl SourceAdapter + 'static) -> Arc<dyn SourceAdapter> {
    Arc::new(a)
}
