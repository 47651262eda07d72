// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::ScheduleConfig;
use crate::ingest::Orchestrator;

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub interval_secs: u64,
    pub run_on_startup: bool,
}

impl From<&ScheduleConfig> for SchedulerCfg {
    fn from(c: &ScheduleConfig) -> Self {
        Self {
            interval_secs: c.interval_secs,
            run_on_startup: c.run_on_startup,
        }
    }
}

/// Spawn the periodic ingestion loop.
///
/// Cycles never overlap: a slow cycle delays the next tick instead of
/// stacking another one behind it.
pub fn spawn_scheduler(orchestrator: Arc<Orchestrator>, cfg: SchedulerCfg) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = Duration::from_secs(cfg.interval_secs.max(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // First tick fires immediately.
        if !cfg.run_on_startup {
            ticker.tick().await;
        }

        tracing::info!(target: "ingest", interval_secs = cfg.interval_secs, run_on_startup = cfg.run_on_startup, "scheduler started");
        loop {
            ticker.tick().await;
            let report = orchestrator.run_cycle().await;
            tracing::info!(
                target: "ingest",
                ingested = report.ingested,
                upserted = report.upserted,
                completed = report.is_completed(),
                "scheduled ingest tick"
            );
        }
    })
}
