use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Status reported when the upstream could not be reached at all
/// (connect failure, timeout, unreadable body).
pub const NETWORK_FAILURE_STATUS: u16 = 599;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum BigSmall {
    Big,
    Small,
}

impl BigSmall {
    pub fn of(number: u8) -> Self {
        if number >= 5 {
            Self::Big
        } else {
            Self::Small
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Big => "BIG",
            Self::Small => "SMALL",
        }
    }
}

impl fmt::Display for BigSmall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One canonical draw result. `period` is the dedup key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DrawEntry {
    pub period: String,
    pub number: u8,
    pub is_big: bool,
    pub label: BigSmall,
    /// Epoch-ms at which the entry was admitted by this process.
    pub timestamp: i64,
}

impl DrawEntry {
    pub fn new(period: impl Into<String>, number: u8, timestamp: i64) -> Self {
        let number = number % 10;
        let label = BigSmall::of(number);
        Self {
            period: period.into(),
            number,
            is_big: label == BigSmall::Big,
            label,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamBody {
    Json(Value),
    Text(String),
    Error(String),
}

impl UpstreamBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Textual rendering used for previews and logs.
    pub fn render(&self) -> String {
        match self {
            Self::Json(v) => v.to_string(),
            Self::Text(t) => t.clone(),
            Self::Error(e) => e.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub status: u16,
    pub body: UpstreamBody,
    pub fetched_at_ms: i64,
    pub latency_ms: u64,
}

impl FetchOutcome {
    pub fn network_failure(message: impl Into<String>, fetched_at_ms: i64, latency_ms: u64) -> Self {
        Self {
            status: NETWORK_FAILURE_STATUS,
            body: UpstreamBody::Error(message.into()),
            fetched_at_ms,
            latency_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200 && !matches!(self.body, UpstreamBody::Error(_))
    }
}

/// One outbound poll of the results API. Implementations never fail:
/// transport problems come back as a [`NETWORK_FAILURE_STATUS`] outcome.
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    async fn fetch(&self) -> FetchOutcome;
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RelayError {
    #[error("upstream returned status {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("no result list found in upstream payload")]
    EmptyExtraction,
    #[error("all {rejected} upstream records were rejected by the mapper")]
    NoUsableRecords { rejected: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_derives_label_from_number() {
        let e = DrawEntry::new("123", 7, 1_000);
        assert!(e.is_big);
        assert_eq!(e.label, BigSmall::Big);

        let e = DrawEntry::new("124", 4, 1_000);
        assert!(!e.is_big);
        assert_eq!(e.label.to_string(), "SMALL");
    }

    #[test]
    fn entry_serializes_camel_case() {
        let e = DrawEntry::new("20240101001", 5, 42);
        let raw = serde_json::to_value(&e).expect("serialize");
        assert_eq!(raw["period"], "20240101001");
        assert_eq!(raw["isBig"], true);
        assert_eq!(raw["label"], "BIG");
        assert_eq!(raw["timestamp"], 42);
    }

    #[test]
    fn network_failure_is_not_success() {
        let out = FetchOutcome::network_failure("timed out", 1, 10_000);
        assert_eq!(out.status, NETWORK_FAILURE_STATUS);
        assert!(!out.is_success());
        assert_eq!(out.body.render(), "timed out");
    }

    #[test]
    fn relay_error_messages() {
        let err = RelayError::Upstream {
            status: 503,
            message: "busy".to_string(),
        };
        assert_eq!(err.to_string(), "upstream returned status 503: busy");
        assert_eq!(
            RelayError::NoUsableRecords { rejected: 3 }.to_string(),
            "all 3 upstream records were rejected by the mapper"
        );
    }
}
