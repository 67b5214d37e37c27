use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use core_types::{FetchOutcome, UpstreamBody, UpstreamSource, NETWORK_FAILURE_STATUS};
use infra_clock::{now_ms, unix_secs};
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT,
};
use reqwest::{Client, Url};
use serde::Serialize;

pub mod extract;

pub use extract::extract_records;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamConfig {
    pub url: String,
    pub page_size: u32,
    pub type_id: i64,
    pub language: i64,
    pub signature: Option<String>,
    pub timeout: Duration,
    /// Extra request headers; these win over the built-in browser headers.
    pub extra_headers: BTreeMap<String, String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9000/api/webapi/GetNoaverageEmerdList".to_string(),
            page_size: 10,
            type_id: 1,
            language: 0,
            signature: None,
            timeout: Duration::from_secs(10),
            extra_headers: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayload {
    pub page_size: u32,
    pub page_no: u32,
    pub type_id: i64,
    pub language: i64,
    pub random: String,
    pub signature: String,
    pub timestamp: i64,
}

pub fn build_payload(cfg: &UpstreamConfig, random: String, timestamp: i64) -> RequestPayload {
    RequestPayload {
        page_size: cfg.page_size,
        page_no: 1,
        type_id: cfg.type_id,
        language: cfg.language,
        random,
        signature: cfg.signature.clone().unwrap_or_default(),
        timestamp,
    }
}

pub fn random_nonce() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let origin = parsed.origin().ascii_serialization();
    (origin != "null").then_some(origin)
}

pub fn request_headers(cfg: &UpstreamConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json;charset=UTF-8"),
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    if let Some(origin) = origin_of(&cfg.url) {
        if let Ok(v) = HeaderValue::from_str(&origin) {
            headers.insert(ORIGIN, v);
        }
        if let Ok(v) = HeaderValue::from_str(&format!("{origin}/")) {
            headers.insert(REFERER, v);
        }
    }

    for (name, value) in &cfg.extra_headers {
        let parsed = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        );
        match parsed {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "skipping invalid extra header"),
        }
    }
    headers
}

/// Classify a body as JSON when the server says so or when it parses anyway.
pub fn decode_body(content_type: &str, text: String) -> UpstreamBody {
    let looks_json = content_type.to_ascii_lowercase().contains("json") || {
        let t = text.trim_start();
        t.starts_with('{') || t.starts_with('[')
    };
    if looks_json {
        if let Ok(value) = serde_json::from_str(&text) {
            return UpstreamBody::Json(value);
        }
    }
    UpstreamBody::Text(text)
}

/// Char-boundary safe truncation for operator-facing previews.
pub fn body_preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

fn describe_transport_error(err: &reqwest::Error, timeout: Duration) -> String {
    if err.is_timeout() {
        format!("timeout after {}ms", timeout.as_millis())
    } else if err.is_connect() {
        format!("connect failed: {err}")
    } else {
        format!("request failed: {err}")
    }
}

pub struct HttpUpstream {
    http: Client,
    cfg: UpstreamConfig,
}

impl HttpUpstream {
    pub fn new(cfg: UpstreamConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(cfg.timeout)
            .default_headers(request_headers(&cfg))
            .build()
            .context("build upstream http client")?;
        Ok(Self { http, cfg })
    }

    pub fn cfg(&self) -> &UpstreamConfig {
        &self.cfg
    }

    pub async fn fetch_once(&self) -> FetchOutcome {
        let fetched_at_ms = now_ms();
        let started = Instant::now();
        let elapsed_ms = |started: Instant| started.elapsed().as_millis() as u64;
        let payload = build_payload(&self.cfg, random_nonce(), unix_secs());

        let resp = match self.http.post(&self.cfg.url).json(&payload).send().await {
            Ok(resp) => resp,
            Err(err) => {
                tracing::warn!(?err, url = %self.cfg.url, "upstream request failed");
                return FetchOutcome::network_failure(
                    describe_transport_error(&err, self.cfg.timeout),
                    fetched_at_ms,
                    elapsed_ms(started),
                );
            }
        };

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        match resp.text().await {
            Ok(text) => FetchOutcome {
                status,
                body: decode_body(&content_type, text),
                fetched_at_ms,
                latency_ms: elapsed_ms(started),
            },
            Err(err) => FetchOutcome {
                status: NETWORK_FAILURE_STATUS,
                body: UpstreamBody::Error(format!(
                    "read body (status {status}): {}",
                    describe_transport_error(&err, self.cfg.timeout)
                )),
                fetched_at_ms,
                latency_ms: elapsed_ms(started),
            },
        }
    }
}

#[async_trait]
impl UpstreamSource for HttpUpstream {
    async fn fetch(&self) -> FetchOutcome {
        self.fetch_once().await
    }
}
