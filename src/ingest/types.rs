// src/ingest/types.rs
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FetchError, NormalizationError};

/// Canonical, post-normalization earthquake event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventRecord {
    /// Source-qualified id, e.g. `usgs:us7000abcd`.
    pub id: String,
    pub source: String,
    pub magnitude: Option<f64>,
    pub magnitude_type: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Kilometers, never negative.
    pub depth: f64,
    pub place: String,
    /// Unix epoch milliseconds (UTC).
    pub origin_time: i64,
    /// `YYYY-MM-DD HH:MM:SS` rendering of `origin_time`.
    pub utc_time: String,
    pub title: String,
    pub event_type: String,
}

/// Ordered records plus collection metadata.
///
/// `count` is always derived from `features`, so it cannot drift from the
/// sequence length. Deserialization rejects payloads whose reported count disagrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "FeedCollectionWire", try_from = "FeedCollectionWire")]
pub struct FeedCollection {
    title: String,
    features: Vec<EventRecord>,
}

impl FeedCollection {
    pub fn new(title: impl Into<String>, features: Vec<EventRecord>) -> Self {
        Self {
            title: title.into(),
            features,
        }
    }

    pub fn empty(title: impl Into<String>) -> Self {
        Self::new(title, Vec::new())
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn count(&self) -> usize {
        self.features.len()
    }

    pub fn features(&self) -> &[EventRecord] {
        &self.features
    }

    pub fn into_features(self) -> Vec<EventRecord> {
        self.features
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionMetadata {
    title: String,
    count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FeedCollectionWire {
    #[serde(rename = "type")]
    kind: String,
    metadata: CollectionMetadata,
    features: Vec<EventRecord>,
}

impl From<FeedCollection> for FeedCollectionWire {
    fn from(c: FeedCollection) -> Self {
        Self {
            kind: "FeatureCollection".to_string(),
            metadata: CollectionMetadata {
                count: c.features.len(),
                title: c.title,
            },
            features: c.features,
        }
    }
}

impl TryFrom<FeedCollectionWire> for FeedCollection {
    type Error = String;

    fn try_from(w: FeedCollectionWire) -> Result<Self, Self::Error> {
        if w.metadata.count != w.features.len() {
            return Err(format!(
                "metadata.count {} does not match {} features",
                w.metadata.count,
                w.features.len()
            ));
        }
        Ok(Self::new(w.metadata.title, w.features))
    }
}

/// Normalizer output: the collection plus every record that was dropped.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub collection: FeedCollection,
    pub rejected: Vec<NormalizationError>,
}

/// Body of a successful fetch, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Json(serde_json::Value),
    Text(String),
    /// The feed answered with its "no content" status.
    Empty,
}

/// Half-open `[start, end)` UTC window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Window of `span` length ending at `end`. A span chrono cannot
    /// represent, or one reaching before its minimum date, falls back to one day.
    pub fn ending_at(end: DateTime<Utc>, span: Duration) -> Self {
        let one_day = chrono::Duration::days(1);
        let start = chrono::Duration::from_std(span)
            .ok()
            .and_then(|s| end.checked_sub_signed(s))
            .unwrap_or(end - one_day);
        Self { start, end }
    }

    /// `YYYY-MM-DDTHH:MM:SS` rendering of both bounds, the common FDSN form.
    pub fn fdsn_bounds(&self) -> (String, String) {
        const FMT: &str = "%Y-%m-%dT%H:%M:%S";
        (
            self.start.format(FMT).to_string(),
            self.end.format(FMT).to_string(),
        )
    }
}

/// One external seismic feed: request building, transport quirks, and
/// mapping of its wire format into canonical records.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable lowercase id, also used as the id prefix.
    fn source_id(&self) -> &'static str;

    /// Upper bound for one fetch.
    fn timeout(&self) -> Duration;

    async fn fetch(&self, window: &TimeWindow) -> Result<RawPayload, FetchError>;

    fn normalize(&self, raw: RawPayload) -> Normalized;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rec(id: &str) -> EventRecord {
        EventRecord {
            id: id.into(),
            source: "usgs".into(),
            magnitude: Some(2.1),
            magnitude_type: "ml".into(),
            latitude: 1.0,
            longitude: 2.0,
            depth: 3.0,
            place: "somewhere".into(),
            origin_time: 0,
            utc_time: "1970-01-01 00:00:00".into(),
            title: "M 2.1 - somewhere".into(),
            event_type: "earthquake".into(),
        }
    }

    #[test]
    fn count_tracks_features() {
        let c = FeedCollection::new("t", vec![rec("a"), rec("b")]);
        assert_eq!(c.count(), 2);
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["metadata"]["count"], 2);
        assert_eq!(v["type"], "FeatureCollection");
    }

    #[test]
    fn mismatched_reported_count_is_rejected() {
        let c = FeedCollection::new("t", vec![rec("a")]);
        let mut v = serde_json::to_value(&c).unwrap();
        v["metadata"]["count"] = serde_json::json!(5);
        assert!(serde_json::from_value::<FeedCollection>(v).is_err());
    }

    #[test]
    fn window_bounds_render_fdsn_format() {
        let end = Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap();
        let w = TimeWindow::ending_at(end, Duration::from_secs(24 * 3600));
        let (s, e) = w.fdsn_bounds();
        assert_eq!(s, "2024-03-01T10:00:00");
        assert_eq!(e, "2024-03-02T10:00:00");
    }

    #[test]
    fn absurd_span_falls_back_to_one_day() {
        let end = Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap();
        let w = TimeWindow::ending_at(end, Duration::from_secs(u64::MAX));
        assert_eq!(w.end - w.start, chrono::Duration::days(1));
        let w = TimeWindow::ending_at(end, Duration::from_secs(u64::MAX / 1_000_000));
        assert_eq!(w.end - w.start, chrono::Duration::days(1));
    }
}
