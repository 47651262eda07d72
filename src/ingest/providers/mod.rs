// src/ingest/providers/mod.rs
pub mod emsc;
pub mod knmi;
pub mod resif;
pub mod sed;
pub mod usgs;

use std::sync::Arc;

use crate::config::feeds::{FeedConfig, FeedKind};
use crate::ingest::types::SourceAdapter;

/// Instantiate the hand-written adapter for one configured feed.
pub fn build_adapter(kind: FeedKind, cfg: &FeedConfig) -> anyhow::Result<Arc<dyn SourceAdapter>> {
    let adapter: Arc<dyn SourceAdapter> = match kind {
        FeedKind::Usgs => Arc::new(usgs::UsgsAdapter::new(cfg)?),
        FeedKind::Emsc => Arc::new(emsc::EmscAdapter::new(cfg)?),
        FeedKind::Knmi => Arc::new(knmi::KnmiAdapter::new(cfg)?),
        FeedKind::Resif => Arc::new(resif::ResifAdapter::new(cfg)?),
        FeedKind::Sed => Arc::new(sed::SedAdapter::new(cfg)?),
    };
    Ok(adapter)
}
