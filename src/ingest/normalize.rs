// src/ingest/normalize.rs
//! Primitives shared by the per-feed normalizers: time canonicalization,
//! depth sign handling, place text cleanup, and display fallbacks.

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

use crate::error::NormalizationError;
use crate::ingest::types::{EventRecord, FeedCollection, Normalized};

pub const DEFAULT_MAGNITUDE_TYPE: &str = "unknown";
pub const DEFAULT_EVENT_TYPE: &str = "earthquake";

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Clean place text: decode entities, strip tags, collapse whitespace, trim.
pub fn clean_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    let out = RE_TAGS.replace_all(&decoded, "");
    let out = RE_WS.replace_all(&out, " ");
    out.trim().to_string()
}

/// Cleaned place, or the feed default when missing/blank.
pub fn place_or_default(raw: Option<&str>, default_place: &str) -> String {
    raw.map(clean_text)
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| default_place.to_string())
}

/// Depth is `abs(z)` for every feed, including those reporting elevation.
pub fn depth_from_z(z: f64) -> f64 {
    z.abs()
}

/// Parse an ISO-8601 timestamp as UTC epoch milliseconds.
///
/// Accepts RFC 3339 (`...Z` or with offset) and zone-less forms, which are
/// taken as UTC.
pub fn iso_to_epoch_ms(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).timestamp_millis());
    }
    let bare = s.trim_end_matches('Z');
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(bare, fmt) {
            return Some(ndt.and_utc().timestamp_millis());
        }
    }
    None
}

/// Cast an already-epoch JSON number to integer milliseconds (no zone math).
pub fn epoch_value_to_ms(v: &Value) -> Option<i64> {
    v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
}

/// `YYYY-MM-DD HH:MM:SS` UTC rendering of epoch milliseconds; `None` when
/// the instant is outside chrono's range.
pub fn ms_to_utc_string(ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(ms).map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Render like the feeds do: integral magnitudes keep one decimal.
pub fn format_magnitude(mag: Option<f64>) -> String {
    match mag {
        Some(m) if m.fract() == 0.0 => format!("{m:.1}"),
        Some(m) => m.to_string(),
        None => "?".to_string(),
    }
}

/// `M {magnitude or '?'} - {place}`
pub fn synthesize_title(mag: Option<f64>, place: &str) -> String {
    format!("M {} - {}", format_magnitude(mag), place)
}

pub fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Longitude/latitude validation shared by all feeds.
pub fn check_coordinates(longitude: f64, latitude: f64) -> Result<(), NormalizationError> {
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(NormalizationError::OutOfRange {
            field: "longitude",
            value: longitude,
        });
    }
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(NormalizationError::OutOfRange {
            field: "latitude",
            value: latitude,
        });
    }
    Ok(())
}

/// Feed-independent fields assembled into a canonical record.
pub struct RecordParts<'a> {
    pub source: &'static str,
    pub raw_id: &'a str,
    pub magnitude: Option<f64>,
    pub magnitude_type: Option<&'a str>,
    pub longitude: f64,
    pub latitude: f64,
    pub z: Option<f64>,
    pub place: String,
    pub origin_time: i64,
    pub title: Option<&'a str>,
    pub event_type: Option<&'a str>,
}

impl RecordParts<'_> {
    pub fn into_record(self) -> Result<EventRecord, NormalizationError> {
        check_coordinates(self.longitude, self.latitude)?;
        let raw_id = self.raw_id.trim();
        if raw_id.is_empty() {
            return Err(NormalizationError::MissingField("id"));
        }
        let utc_time = ms_to_utc_string(self.origin_time).ok_or(NormalizationError::OutOfRange {
            field: "time",
            value: self.origin_time as f64,
        })?;
        let magnitude = self.magnitude.filter(|m| m.is_finite());
        let title = non_empty(self.title).unwrap_or_else(|| synthesize_title(magnitude, &self.place));

        Ok(EventRecord {
            id: format!("{}:{}", self.source, raw_id),
            source: self.source.to_string(),
            magnitude,
            magnitude_type: non_empty(self.magnitude_type)
                .unwrap_or_else(|| DEFAULT_MAGNITUDE_TYPE.to_string()),
            latitude: self.latitude,
            longitude: self.longitude,
            depth: self.z.filter(|z| z.is_finite()).map(depth_from_z).unwrap_or(0.0),
            place: self.place,
            origin_time: self.origin_time,
            utc_time,
            title,
            event_type: non_empty(self.event_type).unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string()),
        })
    }
}

/// Collect per-record results into a collection, dropping failures and
/// duplicate ids while keeping feed order.
pub fn collect_records<I>(title: &str, results: I) -> Normalized
where
    I: IntoIterator<Item = Result<EventRecord, NormalizationError>>,
{
    let mut seen = HashSet::new();
    let mut features = Vec::new();
    let mut rejected = Vec::new();
    for r in results {
        match r {
            Ok(rec) => {
                if seen.insert(rec.id.clone()) {
                    features.push(rec);
                } else {
                    rejected.push(NormalizationError::DuplicateId(rec.id));
                }
            }
            Err(e) => rejected.push(e),
        }
    }
    Normalized {
        collection: FeedCollection::new(title, features),
        rejected,
    }
}

/// JSON helpers for GeoJSON-shaped feeds.
pub mod geojson {
    use super::*;

    /// Features array, or empty when the key is absent.
    pub fn features(payload: &Value) -> &[Value] {
        payload
            .get("features")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// `[lon, lat, z?]` from `geometry.coordinates`.
    pub fn coordinates(feature: &Value) -> Result<(f64, f64, Option<f64>), NormalizationError> {
        let coords = feature
            .get("geometry")
            .and_then(|g| g.get("coordinates"))
            .and_then(Value::as_array)
            .ok_or(NormalizationError::MissingField("geometry.coordinates"))?;
        let lon = coords
            .first()
            .and_then(Value::as_f64)
            .ok_or(NormalizationError::MissingField("longitude"))?;
        let lat = coords
            .get(1)
            .and_then(Value::as_f64)
            .ok_or(NormalizationError::MissingField("latitude"))?;
        Ok((lon, lat, coords.get(2).and_then(Value::as_f64)))
    }

    pub fn prop<'a>(feature: &'a Value, key: &str) -> Option<&'a Value> {
        feature
            .get("properties")
            .and_then(|p| p.get(key))
            .filter(|v| !v.is_null())
    }

    pub fn prop_str<'a>(feature: &'a Value, key: &str) -> Option<&'a str> {
        prop(feature, key).and_then(Value::as_str)
    }

    pub fn prop_f64(feature: &Value, key: &str) -> Option<f64> {
        prop(feature, key).and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    /// Feature-level id as text (numbers are accepted too).
    pub fn feature_id(feature: &Value) -> Option<String> {
        match feature.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// ISO-8601 `properties.<key>` as epoch milliseconds.
    pub fn iso_time_prop(feature: &Value, key: &'static str) -> Result<i64, NormalizationError> {
        let raw = prop_str(feature, key).ok_or(NormalizationError::MissingField(key))?;
        iso_to_epoch_ms(raw).ok_or_else(|| NormalizationError::InvalidField {
            field: key,
            value: raw.to_string(),
        })
    }
}
