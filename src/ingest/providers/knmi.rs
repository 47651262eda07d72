// src/ingest/providers/knmi.rs
//! KNMI FDSN event service, `format=text`.
//!
//! Pipe-delimited rows:
//! `EventID|Time|Latitude|Longitude|Depth/km|Author|Catalog|Contributor|ContributorID|MagType|Magnitude|MagAuthor|EventLocationName[|EventType]`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::config::feeds::FeedConfig;
use crate::error::{FetchError, NormalizationError};
use crate::ingest::http::{build_client, build_url, get_body};
use crate::ingest::normalize::{collect_records, iso_to_epoch_ms, place_or_default, RecordParts};
use crate::ingest::types::{EventRecord, Normalized, RawPayload, SourceAdapter, TimeWindow};

pub const SOURCE_ID: &str = "knmi";
pub const TITLE: &str = "KNMI Earthquakes";
const DEFAULT_PLACE: &str = "KNMI region";
/// Columns up to and including EventLocationName.
pub const REQUIRED_FIELDS: usize = 13;

pub struct KnmiAdapter {
    base_url: String,
    limit: u32,
    timeout: Duration,
    client: Client,
}

impl KnmiAdapter {
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
                ("format", "text".to_string()),
                ("starttime", start),
                ("endtime", end),
                ("limit", self.limit.to_string()),
            ],
        )
    }
}

fn parse_f64(fields: &[&str], idx: usize, name: &'static str) -> Result<f64, NormalizationError> {
    let raw = fields[idx].trim();
    if raw.is_empty() {
        return Err(NormalizationError::MissingField(name));
    }
    raw.parse().map_err(|_| NormalizationError::InvalidField {
        field: name,
        value: raw.to_string(),
    })
}

fn normalize_row(fields: &[&str]) -> Result<EventRecord, NormalizationError> {
    let time_raw = fields[1].trim();
    let origin_time = iso_to_epoch_ms(time_raw).ok_or_else(|| NormalizationError::InvalidField {
        field: "Time",
        value: time_raw.to_string(),
    })?;
    let latitude = parse_f64(fields, 2, "Latitude")?;
    let longitude = parse_f64(fields, 3, "Longitude")?;
    let depth = fields[4].trim().parse::<f64>().ok();
    let magnitude = fields[10].trim().parse::<f64>().ok();

    RecordParts {
        source: SOURCE_ID,
        raw_id: fields[0],
        magnitude,
        magnitude_type: Some(fields[9]),
        longitude,
        latitude,
        z: depth,
        place: place_or_default(Some(fields[12]), DEFAULT_PLACE),
        origin_time,
        title: None,
        event_type: fields.get(13).copied(),
    }
    .into_record()
}

/// Split the body into rows. The first line is the header and is always
/// discarded; short rows are reported as malformed and skipped.
pub fn parse_rows(text: &str) -> Vec<Result<EventRecord, NormalizationError>> {
    text.lines()
        .enumerate()
        .skip(1)
        .filter(|(_, l)| {
            let t = l.trim();
            !t.is_empty() && !t.starts_with('#')
        })
        .map(|(i, line)| {
            let fields: Vec<&str> = line.split('|').collect();
            if fields.len() < REQUIRED_FIELDS {
                return Err(NormalizationError::MalformedLine {
                    line: i + 1,
                    expected: REQUIRED_FIELDS,
                    got: fields.len(),
                });
            }
            normalize_row(&fields)
        })
        .collect()
}

pub fn normalize(raw: &RawPayload) -> Normalized {
    match raw {
        RawPayload::Text(t) => collect_records(TITLE, parse_rows(t)),
        _ => collect_records(TITLE, Vec::new()),
    }
}

#[async_trait]
impl SourceAdapter for KnmiAdapter {
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
        Ok(match body {
            Some(b) if !b.trim().is_empty() => RawPayload::Text(b),
            _ => RawPayload::Empty,
        })
    }

    fn normalize(&self, raw: RawPayload) -> Normalized {
        normalize(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "#EventID|Time|Latitude|Longitude|Depth/km|Author|Catalog|Contributor|ContributorID|MagType|Magnitude|MagAuthor|EventLocationName|EventType
knmi2024abcd|2024-01-15T10:22:31.120|53.33|6.70|3.0|KNMI|KNMI|KNMI|knmi2024abcd|ML|1.8|KNMI|Garrelsweer|induced or triggered event
broken|line|only
knmi2024abce|2024-01-15T11:00:00|53.10|6.60|||KNMI|KNMI|KNMI||||
";

    #[test]
    fn header_dropped_and_short_lines_skipped() {
        let out = normalize(&RawPayload::Text(BODY.to_string()));
        assert_eq!(out.collection.count(), 2);
        assert_eq!(
            out.rejected,
            vec![NormalizationError::MalformedLine {
                line: 3,
                expected: 13,
                got: 3
            }]
        );

        let first = &out.collection.features()[0];
        assert_eq!(first.id, "knmi:knmi2024abcd");
        assert_eq!(first.origin_time, 1_705_314_151_120);
        assert_eq!(first.event_type, "induced or triggered event");
        assert_eq!(first.title, "M 1.8 - Garrelsweer");

        let second = &out.collection.features()[1];
        assert_eq!(second.magnitude, None);
        assert_eq!(second.magnitude_type, "unknown");
        assert_eq!(second.depth, 0.0);
        assert_eq!(second.place, "KNMI region");
        assert_eq!(second.title, "M ? - KNMI region");
    }
}
