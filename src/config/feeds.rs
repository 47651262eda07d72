// src/config/feeds.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// The feeds this service knows how to talk to, in merge order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Usgs,
    Emsc,
    Knmi,
    Resif,
    Sed,
}

impl FeedKind {
    pub const ALL: [FeedKind; 5] = [
        FeedKind::Usgs,
        FeedKind::Emsc,
        FeedKind::Knmi,
        FeedKind::Resif,
        FeedKind::Sed,
    ];

    pub fn id(self) -> &'static str {
        match self {
            FeedKind::Usgs => "usgs",
            FeedKind::Emsc => "emsc",
            FeedKind::Knmi => "knmi",
            FeedKind::Resif => "resif",
            FeedKind::Sed => "sed",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.id().eq_ignore_ascii_case(id.trim()))
    }

    /// Built-in endpoint, timeout and window for each feed.
    pub fn defaults(self) -> FeedConfig {
        let (base_url, timeout_secs, window_minutes) = match self {
            FeedKind::Usgs => ("https://earthquake.usgs.gov/fdsnws/event/1/query", 30, 24 * 60),
            // seismicportal is regularly slow to answer
            FeedKind::Emsc => ("https://www.seismicportal.eu/fdsnws/event/1/query", 60, 24 * 60),
            FeedKind::Knmi => ("https://rdsa.knmi.nl/fdsnws/event/1/query", 30, 7 * 24 * 60),
            FeedKind::Resif => ("https://api.franceseisme.fr/fdsnws/event/1/query", 45, 24 * 60),
            FeedKind::Sed => ("http://arclink.ethz.ch/fdsnws/event/1/query", 30, 24 * 60),
        };
        FeedConfig {
            enabled: true,
            base_url: base_url.to_string(),
            timeout_secs,
            window_minutes,
            limit: 20_000,
        }
    }
}

/// Resolved settings for one feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub enabled: bool,
    pub base_url: String,
    pub timeout_secs: u64,
    pub window_minutes: u64,
    pub limit: u32,
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_minutes.saturating_mul(60))
    }

    fn apply(&mut self, o: &FeedOverrides) {
        if let Some(v) = o.enabled {
            self.enabled = v;
        }
        if let Some(v) = o.base_url.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            self.base_url = v.to_string();
        }
        if let Some(v) = o.timeout_secs.filter(|v| *v > 0) {
            self.timeout_secs = v;
        }
        if let Some(v) = o.window_minutes.filter(|v| *v > 0) {
            self.window_minutes = v;
        }
        if let Some(v) = o.limit.filter(|v| *v > 0) {
            self.limit = v;
        }
    }
}

/// `[feeds.<id>]` table as written in the config file; every key optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedOverrides {
    pub enabled: Option<bool>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub window_minutes: Option<u64>,
    pub limit: Option<u32>,
}

/// Apply file overrides on top of the built-in defaults, in feed order.
/// Unknown feed ids are reported back to the caller.
pub fn resolve_feeds(
    overrides: &BTreeMap<String, FeedOverrides>,
) -> (Vec<(FeedKind, FeedConfig)>, Vec<String>) {
    let mut unknown = Vec::new();
    for key in overrides.keys() {
        if FeedKind::from_id(key).is_none() {
            unknown.push(key.clone());
        }
    }

    let feeds = FeedKind::ALL
        .into_iter()
        .map(|kind| {
            let mut cfg = kind.defaults();
            if let Some(o) = overrides
                .iter()
                .find(|(k, _)| FeedKind::from_id(k) == Some(kind))
                .map(|(_, o)| o)
            {
                cfg.apply(o);
            }
            (kind, cfg)
        })
        .collect();
    (feeds, unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_override_keeps_feed_defaults() {
        let mut o = BTreeMap::new();
        o.insert(
            "EMSC".to_string(),
            FeedOverrides {
                timeout_secs: Some(90),
                window_minutes: Some(0),
                ..Default::default()
            },
        );
        o.insert("nope".to_string(), FeedOverrides::default());

        let (feeds, unknown) = resolve_feeds(&o);
        assert_eq!(unknown, vec!["nope".to_string()]);
        assert_eq!(feeds.len(), 5);
        let (kind, emsc) = &feeds[1];
        assert_eq!(*kind, FeedKind::Emsc);
        assert_eq!(emsc.timeout_secs, 90);
        // zero is ignored, default window stays
        assert_eq!(emsc.window_minutes, 24 * 60);
        assert!(emsc.base_url.contains("seismicportal"));
    }

    #[test]
    fn huge_window_minutes_saturate() {
        let mut cfg = FeedKind::Usgs.defaults();
        cfg.window_minutes = u64::MAX;
        assert_eq!(cfg.window(), Duration::from_secs(u64::MAX));
    }
}
