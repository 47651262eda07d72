// src/ingest/mod.rs
pub mod http;
pub mod merge;
pub mod normalize;
pub mod providers;
pub mod scheduler;
pub mod types;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::config::AppConfig;
use crate::error::FetchError;
use crate::ingest::types::{FeedCollection, RawPayload, SourceAdapter, TimeWindow};
use crate::publish::publish_to_file;
use crate::reconcile::{reconcile_keeping, ReconcileStrategy};
use crate::store::EarthquakeStore;

const DEFAULT_WINDOW: Duration = Duration::from_secs(24 * 3600);

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_records_total", "Records kept after normalization, per source.");
        describe_counter!("ingest_rejected_total", "Raw records dropped by normalization, per source.");
        describe_counter!("ingest_source_errors_total", "Feed fetch failures by source and kind.");
        describe_histogram!("ingest_fetch_ms", "Feed fetch time in milliseconds.");
        describe_counter!("ingest_cycles_total", "Ingestion cycles by final status.");
        describe_counter!("ingest_upserted_total", "Records written by reconciliation.");
        describe_gauge!("ingest_last_cycle_ts", "Unix ts when the last cycle finished.");
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePhase {
    Idle,
    Fetching,
    Normalizing,
    Merging,
    Reconciling,
    Publishing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub status: SourceStatus,
    pub records: usize,
    pub rejected: usize,
    /// `fetch` or `timeout` when failed.
    pub error_kind: Option<String>,
    pub error: Option<String>,
    pub fetch_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub started_at: i64,
    pub finished_at: i64,
    pub sources: Vec<SourceReport>,
    pub ingested: usize,
    pub inserted: usize,
    pub updated: usize,
    pub upserted: usize,
    /// Rows of failed feeds carried over by a replace cycle.
    pub preserved: usize,
    pub status: CycleStatus,
    pub failure: Option<String>,
    pub exported: Option<PathBuf>,
    pub export_error: Option<String>,
}

impl CycleReport {
    pub fn failed_sources(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| s.status == SourceStatus::Failed)
            .count()
    }

    pub fn is_completed(&self) -> bool {
        self.status == CycleStatus::Completed
    }
}

/// Cycle-level knobs; adapters carry their own endpoints and timeouts.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub strategy: ReconcileStrategy,
    pub export_path: Option<PathBuf>,
    /// Per-source window length; `default_window` otherwise.
    pub windows: HashMap<&'static str, Duration>,
    pub default_window: Duration,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            strategy: ReconcileStrategy::default(),
            export_path: None,
            windows: HashMap::new(),
            default_window: DEFAULT_WINDOW,
        }
    }
}

/// Drives fetch → normalize → merge → reconcile → publish.
pub struct Orchestrator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    store: Arc<dyn EarthquakeStore>,
    settings: CycleSettings,
    cycle_gate: tokio::sync::Mutex<()>,
    phase: Mutex<CyclePhase>,
    last_report: RwLock<Option<CycleReport>>,
}

impl Orchestrator {
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        store: Arc<dyn EarthquakeStore>,
        settings: CycleSettings,
    ) -> Self {
        Self {
            adapters,
            store,
            settings,
            cycle_gate: tokio::sync::Mutex::new(()),
            phase: Mutex::new(CyclePhase::Idle),
            last_report: RwLock::new(None),
        }
    }

    /// Build every enabled feed adapter from configuration.
    pub fn from_config(cfg: &AppConfig, store: Arc<dyn EarthquakeStore>) -> anyhow::Result<Self> {
        let mut adapters = Vec::new();
        let mut windows = HashMap::new();
        for (kind, feed) in cfg.enabled_feeds() {
            adapters.push(providers::build_adapter(*kind, feed)?);
            windows.insert(kind.id(), feed.window());
        }
        let settings = CycleSettings {
            strategy: cfg.store.strategy,
            export_path: cfg.publish.export_path.clone(),
            windows,
            default_window: DEFAULT_WINDOW,
        };
        tracing::info!(
            feeds = ?adapters.iter().map(|a| a.source_id()).collect::<Vec<_>>(),
            store = store.name(),
            "orchestrator configured"
        );
        Ok(Self::new(adapters, store, settings))
    }

    pub fn store(&self) -> Arc<dyn EarthquakeStore> {
        self.store.clone()
    }

    pub fn source_ids(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.source_id()).collect()
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase.lock().map(|p| *p).unwrap_or(CyclePhase::Idle)
    }

    pub fn last_report(&self) -> Option<CycleReport> {
        self.last_report.read().ok().and_then(|r| r.clone())
    }

    fn set_phase(&self, next: CyclePhase) {
        if let Ok(mut p) = self.phase.lock() {
            tracing::debug!(target: "ingest", from = ?*p, to = ?next, "cycle phase");
            *p = next;
        }
    }

    fn window_for(&self, source: &str, end: chrono::DateTime<Utc>) -> TimeWindow {
        let span = self
            .settings
            .windows
            .get(source)
            .copied()
            .unwrap_or(self.settings.default_window);
        TimeWindow::ending_at(end, span)
    }

    /// Run one full cycle. Never aborts: per-source failures are recorded
    /// and a storage failure marks the report as failed. Overlapping calls
    /// wait for the running cycle to finish.
    pub async fn run_cycle(&self) -> CycleReport {
        ensure_metrics_described();
        let _gate = self.cycle_gate.lock().await;
        let started = Utc::now();

        // Fetching
        self.set_phase(CyclePhase::Fetching);
        let fetches = self.adapters.iter().map(|adapter| {
            let window = self.window_for(adapter.source_id(), started);
            async move {
                let t0 = Instant::now();
                let limit = adapter.timeout();
                let res = match tokio::time::timeout(limit, adapter.fetch(&window)).await {
                    Ok(r) => r,
                    Err(_) => Err(FetchError::Timeout { after: limit }),
                };
                (adapter, res, t0.elapsed())
            }
        });
        let fetched = futures::future::join_all(fetches).await;

        // Normalizing
        self.set_phase(CyclePhase::Normalizing);
        let mut sources = Vec::with_capacity(fetched.len());
        let mut collections = Vec::with_capacity(fetched.len());
        for (adapter, res, elapsed) in fetched {
            let source = adapter.source_id();
            let fetch_ms = elapsed.as_millis() as u64;
            histogram!("ingest_fetch_ms", "source" => source).record(elapsed.as_secs_f64() * 1_000.0);
            match res {
                Ok(raw) => {
                    let no_content = raw == RawPayload::Empty;
                    let normalized = adapter.normalize(raw);
                    for e in &normalized.rejected {
                        tracing::warn!(target: "ingest", source, error = %e, "record dropped");
                    }
                    let records = normalized.collection.count();
                    let rejected = normalized.rejected.len();
                    counter!("ingest_records_total", "source" => source).increment(records as u64);
                    counter!("ingest_rejected_total", "source" => source).increment(rejected as u64);
                    tracing::info!(target: "ingest", source, records, rejected, no_content, fetch_ms, "source ok");
                    sources.push(SourceReport {
                        source: source.to_string(),
                        status: SourceStatus::Ok,
                        records,
                        rejected,
                        error_kind: None,
                        error: None,
                        fetch_ms,
                    });
                    collections.push(normalized.collection);
                }
                Err(e) => {
                    tracing::warn!(target: "ingest", source, kind = e.kind(), error = %e, "source failed");
                    counter!("ingest_source_errors_total", "source" => source, "kind" => e.kind())
                        .increment(1);
                    sources.push(SourceReport {
                        source: source.to_string(),
                        status: SourceStatus::Failed,
                        records: 0,
                        rejected: 0,
                        error_kind: Some(e.kind().to_string()),
                        error: Some(e.to_string()),
                        fetch_ms,
                    });
                    collections.push(FeedCollection::empty(source));
                }
            }
        }

        // Merging
        self.set_phase(CyclePhase::Merging);
        let merged = merge::merge(collections);
        let ingested = merged.count();

        // Reconciling
        self.set_phase(CyclePhase::Reconciling);
        let failed: Vec<&str> = sources
            .iter()
            .filter(|s| s.status == SourceStatus::Failed)
            .map(|s| s.source.as_str())
            .collect();
        let reconciled =
            reconcile_keeping(self.store.as_ref(), self.settings.strategy, merged.features(), &failed).await;

        let mut report = CycleReport {
            started_at: started.timestamp_millis(),
            finished_at: 0,
            sources,
            ingested,
            inserted: 0,
            updated: 0,
            upserted: 0,
            preserved: 0,
            status: CycleStatus::Completed,
            failure: None,
            exported: None,
            export_error: None,
        };

        match reconciled {
            Ok(outcome) => {
                let counts = outcome.counts;
                report.preserved = outcome.preserved;
                report.inserted = counts.inserted;
                report.updated = counts.updated;
                report.upserted = counts.total();
                counter!("ingest_upserted_total").increment(counts.total() as u64);

                // Publishing
                if let Some(path) = &self.settings.export_path {
                    self.set_phase(CyclePhase::Publishing);
                    match publish_to_file(self.store.as_ref(), path).await {
                        Ok(_) => report.exported = Some(path.clone()),
                        Err(e) => {
                            tracing::error!(target: "ingest", error = %e, path = %path.display(), "export failed");
                            report.export_error = Some(e.to_string());
                        }
                    }
                }
            }
            Err(e) => {
                tracing::error!(target: "ingest", error = %e, "reconciliation failed; prior state kept");
                report.status = CycleStatus::Failed;
                report.failure = Some(e.to_string());
            }
        }

        self.set_phase(CyclePhase::Idle);
        let finished = Utc::now();
        report.finished_at = finished.timestamp_millis();

        let status_label = match report.status {
            CycleStatus::Completed => "completed",
            CycleStatus::Failed => "failed",
        };
        counter!("ingest_cycles_total", "status" => status_label).increment(1);
        gauge!("ingest_last_cycle_ts").set(finished.timestamp() as f64);

        tracing::info!(
            target: "ingest",
            status = status_label,
            ingested = report.ingested,
            upserted = report.upserted,
            failed_sources = report.failed_sources(),
            "cycle finished"
        );

        if let Ok(mut last) = self.last_report.write() {
            *last = Some(report.clone());
        }
        report
    }
}
