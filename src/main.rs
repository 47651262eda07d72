//! Earthquake feed service: binary entrypoint.
//! Boots the Axum HTTP server, the `/metrics` exporter, and the periodic
//! ingestion scheduler.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;

use quakes_near_me::config::AppConfig;
use quakes_near_me::ingest::scheduler::{spawn_scheduler, SchedulerCfg};
use quakes_near_me::metrics::Metrics;
use quakes_near_me::{build_state, logging, router};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    if !logging::init_tracing() {
        tracing::debug!("tracing subscriber already installed by the runtime");
    }

    let cfg = AppConfig::load_default().context("loading configuration")?;
    let state = build_state(&cfg).await?;

    let mut app = router(state.clone(), &cfg.server);
    match Metrics::install() {
        Ok(m) => app = app.merge(m.router()),
        Err(e) => tracing::warn!(error = %e, "metrics exporter disabled"),
    }

    spawn_scheduler(state.orchestrator.clone(), SchedulerCfg::from(&cfg.schedule));

    Ok(app.into())
}
