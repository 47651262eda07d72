// src/config/mod.rs
//! Service configuration.
//!
//! Resolution order:
//! 1) `$QUAKES_CONFIG_PATH` (must exist when set)
//! 2) `config/quakes.toml`
//! 3) built-in defaults
//!
//! Selected values can then be overridden from the environment (see `ENV_*`).

pub mod feeds;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::reconcile::ReconcileStrategy;
use feeds::{resolve_feeds, FeedConfig, FeedKind, FeedOverrides};

pub const DEFAULT_CONFIG_PATH: &str = "config/quakes.toml";
pub const ENV_CONFIG_PATH: &str = "QUAKES_CONFIG_PATH";
pub const ENV_STORE_PATH: &str = "QUAKES_STORE_PATH";
pub const ENV_STORE_BACKEND: &str = "QUAKES_STORE_BACKEND";
pub const ENV_EXPORT_PATH: &str = "QUAKES_EXPORT_PATH";
pub const ENV_INTERVAL_SECS: &str = "QUAKES_INTERVAL_SECS";

const MIN_INTERVAL_SECS: u64 = 60;

fn default_interval_secs() -> u64 {
    15 * 60
}
fn default_true() -> bool {
    true
}
fn default_store_path() -> PathBuf {
    PathBuf::from("state/earthquakes.json")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            run_on_startup: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub strategy: ReconcileStrategy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
            strategy: ReconcileStrategy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublishConfig {
    /// When set, every successful cycle rewrites this GeoJSON file.
    #[serde(default)]
    pub export_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    /// Empty means permissive CORS.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// On-disk shape of the config file.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    schedule: ScheduleConfig,
    #[serde(default)]
    store: StoreConfig,
    #[serde(default)]
    publish: PublishConfig,
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    feeds: BTreeMap<String, FeedOverrides>,
}

/// Fully resolved configuration passed to the orchestrator and router.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub schedule: ScheduleConfig,
    pub store: StoreConfig,
    pub publish: PublishConfig,
    pub server: ServerConfig,
    pub feeds: Vec<(FeedKind, FeedConfig)>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_file_struct(ConfigFile::default())
    }
}

impl AppConfig {
    /// Parse a TOML document (no env overrides applied).
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(s).context("parsing quakes config toml")?;
        Ok(Self::from_file_struct(file))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Resolve the file via env var + fallbacks, then apply env overrides.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let pb = PathBuf::from(DEFAULT_CONFIG_PATH);
            if pb.exists() {
                Self::load_from(&pb)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    fn from_file_struct(file: ConfigFile) -> Self {
        let (feeds, unknown) = resolve_feeds(&file.feeds);
        for id in unknown {
            tracing::warn!(feed = %id, "ignoring unknown feed in config");
        }
        let mut cfg = Self {
            schedule: file.schedule,
            store: file.store,
            publish: file.publish,
            server: file.server,
            feeds,
        };
        cfg.sanitize();
        cfg
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(p) = std::env::var(ENV_STORE_PATH) {
            if !p.trim().is_empty() {
                self.store.path = PathBuf::from(p);
            }
        }
        if let Ok(b) = std::env::var(ENV_STORE_BACKEND) {
            self.store.backend = match b.trim().to_ascii_lowercase().as_str() {
                "file" => StoreBackend::File,
                "memory" => StoreBackend::Memory,
                other => return Err(anyhow!("unsupported {ENV_STORE_BACKEND}: {other}")),
            };
        }
        if let Ok(p) = std::env::var(ENV_EXPORT_PATH) {
            self.publish.export_path = Some(p).filter(|s| !s.trim().is_empty()).map(PathBuf::from);
        }
        if let Ok(v) = std::env::var(ENV_INTERVAL_SECS) {
            self.schedule.interval_secs = v
                .trim()
                .parse()
                .with_context(|| format!("parsing {ENV_INTERVAL_SECS}={v}"))?;
        }
        self.sanitize();
        Ok(())
    }

    fn sanitize(&mut self) {
        if self.schedule.interval_secs < MIN_INTERVAL_SECS {
            self.schedule.interval_secs = MIN_INTERVAL_SECS;
        }
        self.server.allowed_origins.retain(|o| !o.trim().is_empty());
    }

    pub fn enabled_feeds(&self) -> impl Iterator<Item = &(FeedKind, FeedConfig)> {
        self.feeds.iter().filter(|(_, f)| f.enabled)
    }
}
