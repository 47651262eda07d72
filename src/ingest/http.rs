// src/ingest/http.rs
use std::time::Duration;

use reqwest::{Client, StatusCode, Url};

use crate::error::FetchError;

const USER_AGENT: &str = concat!("quakes-near-me/", env!("CARGO_PKG_VERSION"));
const ERROR_BODY_MAX: usize = 512;

/// Client with the feed's own timeout baked in.
pub fn build_client(timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| anyhow::anyhow!("building feed http client: {e}"))
}

pub fn build_url(base: &str, params: &[(&str, String)]) -> Result<Url, FetchError> {
    Url::parse_with_params(base, params).map_err(|e| FetchError::InvalidUrl(format!("{base}: {e}")))
}

/// GET `url`. `Ok(None)` when the feed answered with one of its
/// `no_content` statuses; any status other than 200 is an error.
pub async fn get_body(
    client: &Client,
    url: Url,
    timeout: Duration,
    no_content: &[StatusCode],
) -> Result<Option<String>, FetchError> {
    let resp = client.get(url).send().await.map_err(|e| with_timeout(e, timeout))?;
    let status = resp.status();

    if no_content.contains(&status) {
        return Ok(None);
    }
    if status != StatusCode::OK {
        let mut body = resp.text().await.unwrap_or_default();
        if body.len() > ERROR_BODY_MAX {
            let cut = (0..=ERROR_BODY_MAX)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0);
            body.truncate(cut);
        }
        return Err(FetchError::Status {
            status: status.as_u16(),
            body,
        });
    }

    resp.text()
        .await
        .map(Some)
        .map_err(|e| with_timeout(e, timeout))
}

fn with_timeout(e: reqwest::Error, timeout: Duration) -> FetchError {
    match FetchError::from(e) {
        FetchError::Timeout { .. } => FetchError::Timeout { after: timeout },
        other => other,
    }
}

/// Decode a JSON body, treating a missing body as `RawPayload::Empty`.
pub fn json_payload(body: Option<String>) -> Result<crate::ingest::types::RawPayload, FetchError> {
    use crate::ingest::types::RawPayload;
    match body {
        None => Ok(RawPayload::Empty),
        Some(b) if b.trim().is_empty() => Ok(RawPayload::Empty),
        Some(b) => serde_json::from_str(&b)
            .map(RawPayload::Json)
            .map_err(|e| FetchError::Decode(e.to_string())),
    }
}
