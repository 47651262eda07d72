//! Run a single ingestion cycle against the configured store and print the
//! cycle report as JSON. Exit code is non-zero when the cycle failed.

use anyhow::Context;

use quakes_near_me::config::AppConfig;
use quakes_near_me::{build_state, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    logging::init_tracing();

    let cfg = AppConfig::load_default().context("loading configuration")?;
    let state = build_state(&cfg).await?;

    let report = state.orchestrator.run_cycle().await;
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serializing cycle report")?
    );

    if !report.is_completed() {
        std::process::exit(1);
    }
    Ok(())
}
