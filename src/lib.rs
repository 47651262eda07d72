// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod atomic_file;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod publish;
pub mod reconcile;
pub mod store;

pub use crate::api::{router, AppState};
pub use crate::ingest::{CycleReport, Orchestrator};

use std::sync::Arc;

use anyhow::Context;

use crate::config::{AppConfig, StoreBackend};
use crate::store::{EarthquakeStore, JsonFileStore, MemoryStore};

/// Open the store backend selected in configuration.
pub async fn open_store(cfg: &AppConfig) -> anyhow::Result<Arc<dyn EarthquakeStore>> {
    let store: Arc<dyn EarthquakeStore> = match cfg.store.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::File => Arc::new(
            JsonFileStore::open(&cfg.store.path)
                .await
                .with_context(|| format!("opening store at {}", cfg.store.path.display()))?,
        ),
    };
    Ok(store)
}

/// Store plus orchestrator, ready for the router and scheduler.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let store = open_store(cfg).await?;
    let orchestrator = Orchestrator::from_config(cfg, store).context("building feed adapters")?;
    Ok(AppState::new(Arc::new(orchestrator)))
}
