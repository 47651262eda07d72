//! Error taxonomy for the ingestion pipeline.
//!
//! Per-source failures (`FetchError`, `NormalizationError`) are isolated by
//! the orchestrator; storage failures (`ReconciliationError`, `PublishError`)
//! surface to the caller.

use std::time::Duration;
use thiserror::Error;

/// Transport or status failure of one Source Adapter.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode payload: {0}")]
    Decode(String),

    #[error("invalid request url: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Short tag used in cycle reports and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout { .. } => "timeout",
            _ => "fetch",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            // reqwest does not expose the configured duration on the error
            FetchError::Timeout {
                after: Duration::ZERO,
            }
        } else if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// One raw record could not be mapped to the canonical shape.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` has invalid value: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("field `{field}` out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("duplicate id `{0}` in payload")]
    DuplicateId(String),

    #[error("malformed line {line}: expected at least {expected} fields, got {got}")]
    MalformedLine {
        line: usize,
        expected: usize,
        got: usize,
    },
}

/// Failures of the persisted store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Storage write failure; fatal to the cycle.
#[derive(Error, Debug)]
pub enum ReconciliationError {
    #[error("reconciliation write failed: {0}")]
    Store(#[from] StoreError),
}

/// Storage unreadable or export destination unwritable.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("store unreadable: {0}")]
    Store(#[from] StoreError),

    #[error("export io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("export serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
