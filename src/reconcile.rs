// src/reconcile.rs
//! Apply a merged collection against the persisted store.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ReconciliationError;
use crate::ingest::types::EventRecord;
use crate::store::{EarthquakeStore, PersistedEarthquake, UpsertCounts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileStrategy {
    /// Insert new ids, overwrite existing ones in place.
    #[default]
    Upsert,
    /// Clear the table and load the cycle's records.
    Replace,
}

/// What one reconciliation wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileOutcome {
    pub counts: UpsertCounts,
    /// Stored rows carried over from feeds that failed this cycle (replace only).
    pub preserved: usize,
}

/// Full-record replacement by id, as one atomic store call.
pub async fn reconcile(
    store: &dyn EarthquakeStore,
    strategy: ReconcileStrategy,
    records: &[EventRecord],
) -> Result<UpsertCounts, ReconciliationError> {
    Ok(reconcile_keeping(store, strategy, records, &[]).await?.counts)
}

/// Like [`reconcile`], but under `Replace` the stored rows of `failed_sources`
/// are carried into the reload, so an unreachable feed keeps its last good data.
pub async fn reconcile_keeping(
    store: &dyn EarthquakeStore,
    strategy: ReconcileStrategy,
    records: &[EventRecord],
    failed_sources: &[&str],
) -> Result<ReconcileOutcome, ReconciliationError> {
    let mut rows: Vec<PersistedEarthquake> = records.iter().map(PersistedEarthquake::from).collect();
    let outcome = match strategy {
        ReconcileStrategy::Upsert => ReconcileOutcome {
            counts: store.upsert_batch(rows).await?,
            preserved: 0,
        },
        ReconcileStrategy::Replace => {
            let mut preserved = 0;
            if !failed_sources.is_empty() {
                let fresh_ids: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
                let kept: Vec<PersistedEarthquake> = store
                    .scan_all()
                    .await?
                    .into_iter()
                    .filter(|q| {
                        failed_sources.contains(&q.source.as_str()) && !fresh_ids.contains(q.id.as_str())
                    })
                    .collect();
                preserved = kept.len();
                rows.extend(kept);
                tracing::warn!(
                    target: "reconcile",
                    ?failed_sources,
                    preserved,
                    "replace keeps stored rows of failed feeds"
                );
            }
            let total = store.replace_all(rows).await?;
            ReconcileOutcome {
                counts: UpsertCounts {
                    inserted: total.saturating_sub(preserved),
                    updated: 0,
                },
                preserved,
            }
        }
    };
    tracing::info!(
        target: "reconcile",
        store = store.name(),
        ?strategy,
        inserted = outcome.counts.inserted,
        updated = outcome.counts.updated,
        preserved = outcome.preserved,
        "reconciled"
    );
    Ok(outcome)
}
