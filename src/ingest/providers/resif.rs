// src/ingest/providers/resif.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::config::feeds::FeedConfig;
use crate::error::{FetchError, NormalizationError};
use crate::ingest::http::{build_client, build_url, get_body, json_payload};
use crate::ingest::normalize::{clean_text, collect_records, geojson, RecordParts};
use crate::ingest::types::{EventRecord, Normalized, RawPayload, SourceAdapter, TimeWindow};

pub const SOURCE_ID: &str = "resif";
pub const TITLE: &str = "RESIF Earthquakes";
const DEFAULT_PLACE: &str = "RESIF region";
const NATIVE_LANGUAGE: &str = "fr";

/// RESIF / franceseisme FDSN endpoint.
pub struct ResifAdapter {
    base_url: String,
    limit: u32,
    timeout: Duration,
    client: Client,
}

impl ResifAdapter {
    pub fn new(cfg: &FeedConfig) -> anyhow::Result<Self> {
        Ok(Self {
            base_url: cfg.base_url.clone(),
            limit: cfg.limit,
            timeout: cfg.timeout(),
            client: build_client(cfg.timeout())?,
        })
    }

    fn request_url(&self, window: &TimeWindow) -> Result<reqwest::Url, FetchError> {
        let (start, end) = window.fdsn_bounds();
        build_url(
            &self.base_url,
            &[
                ("format", "json".to_string()),
                ("starttime", start),
                ("endtime", end),
                ("limit", self.limit.to_string()),
                ("orderby", "time".to_string()),
            ],
        )
    }
}

/// `description` is either plain text or a language map; prefer English,
/// then French, then the feed default.
pub fn resolve_description(desc: Option<&Value>) -> String {
    let pick = |s: Option<&str>| s.map(clean_text).filter(|s| !s.is_empty());
    let resolved = match desc {
        Some(Value::String(s)) => pick(Some(s.as_str())),
        Some(Value::Object(map)) => pick(map.get("en").and_then(Value::as_str))
            .or_else(|| pick(map.get(NATIVE_LANGUAGE).and_then(Value::as_str))),
        _ => None,
    };
    resolved.unwrap_or_else(|| DEFAULT_PLACE.to_string())
}

fn normalize_feature(f: &Value) -> Result<EventRecord, NormalizationError> {
    let raw_id = geojson::feature_id(f).ok_or(NormalizationError::MissingField("id"))?;
    let (lon, lat, z) = geojson::coordinates(f)?;
    let origin_time = geojson::iso_time_prop(f, "time")?;

    RecordParts {
        source: SOURCE_ID,
        raw_id: &raw_id,
        magnitude: geojson::prop_f64(f, "mag"),
        magnitude_type: geojson::prop_str(f, "magType"),
        longitude: lon,
        latitude: lat,
        z,
        place: resolve_description(geojson::prop(f, "description")),
        origin_time,
        title: None,
        event_type: geojson::prop_str(f, "type"),
    }
    .into_record()
}

pub fn normalize(raw: &RawPayload) -> Normalized {
    match raw {
        RawPayload::Json(v) => collect_records(TITLE, geojson::features(v).iter().map(normalize_feature)),
        _ => collect_records(TITLE, Vec::new()),
    }
}

#[async_trait]
impl SourceAdapter for ResifAdapter {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, window: &TimeWindow) -> Result<RawPayload, FetchError> {
        let url = self.request_url(window)?;
        tracing::debug!(source = SOURCE_ID, %url, "fetching");
        let body = get_body(&self.client, url, self.timeout, &[StatusCode::NO_CONTENT]).await?;
        json_payload(body)
    }

    fn normalize(&self, raw: RawPayload) -> Normalized {
        normalize(&raw)
    }
}
