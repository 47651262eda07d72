// src/logging.rs
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const ENV_LOG_FORMAT: &str = "QUAKES_LOG_FORMAT";
const DEFAULT_FILTER: &str = "quakes_near_me=info,tower_http=info,warn";

/// Install the global subscriber. `RUST_LOG` wins over the default filter;
/// `QUAKES_LOG_FORMAT=json` switches to JSON lines.
///
/// Returns `false` when a subscriber was already installed (e.g. by the host runtime).
pub fn init_tracing() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let json = std::env::var(ENV_LOG_FORMAT)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    res.is_ok()
}
