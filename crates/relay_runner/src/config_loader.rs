use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use feed_upstream::UpstreamConfig;
use rolling_cache::RetentionPolicy;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RelayConfig {
    pub(crate) upstream: UpstreamConfig,
    pub(crate) retention: RetentionPolicy,
    pub(crate) poll_interval: Duration,
    pub(crate) bind: SocketAddr,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            upstream: UpstreamConfig::default(),
            retention: RetentionPolicy::default(),
            poll_interval: Duration::from_millis(12_000),
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

fn relay_config_path() -> PathBuf {
    std::env::var("DRAWRELAY_CONFIG_PATH")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("configs/relay.toml"))
}

pub(crate) fn load_relay_config() -> RelayConfig {
    let path = relay_config_path();
    let mut cfg = match fs::read_to_string(&path) {
        Ok(raw) => parse_relay_config(&raw).unwrap_or_else(|err| {
            tracing::warn!(?err, path = %path.display(), "relay config unusable; using defaults");
            RelayConfig::default()
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no relay config file; using defaults");
            RelayConfig::default()
        }
        Err(err) => {
            tracing::warn!(?err, path = %path.display(), "relay config unreadable; using defaults");
            RelayConfig::default()
        }
    };
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    cfg
}

#[derive(Debug, Default, Deserialize)]
struct RelayFile {
    upstream: Option<UpstreamSection>,
    cache: Option<CacheSection>,
    scheduler: Option<SchedulerSection>,
    server: Option<ServerSection>,
}

#[derive(Debug, Default, Deserialize)]
struct UpstreamSection {
    url: Option<String>,
    page_size: Option<u32>,
    type_id: Option<i64>,
    language: Option<i64>,
    signature: Option<String>,
    timeout_ms: Option<u64>,
    extra_headers: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
struct CacheSection {
    /// 0 disables the capacity policy.
    capacity: Option<usize>,
    /// 0 disables the age policy.
    retention_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SchedulerSection {
    poll_interval_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    bind: Option<String>,
}

pub(crate) fn parse_relay_config(raw: &str) -> Result<RelayConfig> {
    let parsed = toml::from_str::<RelayFile>(raw).context("parse relay config toml")?;
    let mut cfg = RelayConfig::default();

    if let Some(section) = parsed.upstream {
        if let Some(v) = section.url {
            cfg.upstream.url = v;
        }
        if let Some(v) = section.page_size {
            cfg.upstream.page_size = clamp_page_size(v);
        }
        if let Some(v) = section.type_id {
            cfg.upstream.type_id = v;
        }
        if let Some(v) = section.language {
            cfg.upstream.language = v;
        }
        if let Some(v) = section.signature {
            cfg.upstream.signature = (!v.trim().is_empty()).then_some(v);
        }
        if let Some(v) = section.timeout_ms {
            cfg.upstream.timeout = Duration::from_millis(v.max(100));
        }
        if let Some(v) = section.extra_headers {
            cfg.upstream.extra_headers = v;
        }
    }
    if let Some(section) = parsed.cache {
        if let Some(v) = section.capacity {
            cfg.retention.capacity = capacity_policy(v);
        }
        if let Some(v) = section.retention_secs {
            cfg.retention.max_age = age_policy(v);
        }
    }
    if let Some(v) = parsed.scheduler.and_then(|s| s.poll_interval_ms) {
        cfg.poll_interval = poll_interval(v);
    }
    if let Some(v) = parsed.server.and_then(|s| s.bind) {
        cfg.bind = v
            .parse()
            .with_context(|| format!("parse server.bind {v:?}"))?;
    }
    Ok(cfg)
}

fn clamp_page_size(v: u32) -> u32 {
    v.clamp(1, 100)
}

fn capacity_policy(v: usize) -> Option<usize> {
    (v > 0).then_some(v)
}

fn age_policy(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn poll_interval(ms: u64) -> Duration {
    Duration::from_millis(ms.max(1_000))
}

fn env_value(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = env_value(lookup, key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable env override");
            None
        }
    }
}

pub(crate) fn parse_extra_headers(raw: &str) -> Option<BTreeMap<String, String>> {
    let value = serde_json::from_str::<serde_json::Value>(raw).ok()?;
    let obj = value.as_object()?;
    Some(
        obj.iter()
            .filter_map(|(k, v)| match v {
                serde_json::Value::String(s) => Some((k.clone(), s.clone())),
                serde_json::Value::Number(n) => Some((k.clone(), n.to_string())),
                serde_json::Value::Bool(b) => Some((k.clone(), b.to_string())),
                _ => None,
            })
            .collect(),
    )
}

pub(crate) fn apply_env_overrides(cfg: &mut RelayConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = env_value(&lookup, "DRAWRELAY_UPSTREAM_URL") {
        cfg.upstream.url = v.trim().to_string();
    }
    if let Some(v) = env_parse::<u32>(&lookup, "DRAWRELAY_PAGE_SIZE") {
        cfg.upstream.page_size = clamp_page_size(v);
    }
    if let Some(v) = env_parse::<i64>(&lookup, "DRAWRELAY_TYPE_ID") {
        cfg.upstream.type_id = v;
    }
    if let Some(v) = env_parse::<i64>(&lookup, "DRAWRELAY_LANGUAGE") {
        cfg.upstream.language = v;
    }
    if let Some(v) = env_value(&lookup, "DRAWRELAY_SIGNATURE") {
        cfg.upstream.signature = Some(v);
    }
    if let Some(v) = env_parse::<u64>(&lookup, "DRAWRELAY_TIMEOUT_MS") {
        cfg.upstream.timeout = Duration::from_millis(v.max(100));
    }
    if let Some(raw) = env_value(&lookup, "DRAWRELAY_EXTRA_HEADERS") {
        match parse_extra_headers(&raw) {
            Some(headers) => cfg.upstream.extra_headers.extend(headers),
            None => tracing::warn!("DRAWRELAY_EXTRA_HEADERS is not a JSON object; ignored"),
        }
    }
    if let Some(v) = env_parse::<usize>(&lookup, "DRAWRELAY_CACHE_CAPACITY") {
        cfg.retention.capacity = capacity_policy(v);
    }
    if let Some(v) = env_parse::<u64>(&lookup, "DRAWRELAY_RETENTION_SECS") {
        cfg.retention.max_age = age_policy(v);
    }
    if let Some(v) = env_parse::<u64>(&lookup, "DRAWRELAY_POLL_INTERVAL_MS") {
        cfg.poll_interval = poll_interval(v);
    }
    if let Some(v) = env_parse::<SocketAddr>(&lookup, "DRAWRELAY_BIND") {
        cfg.bind = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.upstream.page_size, 10);
        assert_eq!(cfg.upstream.timeout, Duration::from_secs(10));
        assert_eq!(cfg.retention.capacity, Some(21));
        assert_eq!(cfg.retention.max_age, None);
        assert_eq!(cfg.poll_interval, Duration::from_secs(12));
        assert_eq!(cfg.bind.port(), 8080);
    }

    #[test]
    fn file_sections_override_defaults() {
        let raw = r#"
            [upstream]
            url = "https://draws.example.com/api/list"
            page_size = 500
            type_id = 30
            timeout_ms = 50
            extra_headers = { Authorization = "Bearer x" }

            [cache]
            capacity = 0
            retention_secs = 1800

            [scheduler]
            poll_interval_ms = 60000

            [server]
            bind = "127.0.0.1:9090"
        "#;
        let cfg = parse_relay_config(raw).expect("parse");
        assert_eq!(cfg.upstream.url, "https://draws.example.com/api/list");
        assert_eq!(cfg.upstream.page_size, 100);
        assert_eq!(cfg.upstream.type_id, 30);
        assert_eq!(cfg.upstream.timeout, Duration::from_millis(100));
        assert_eq!(
            cfg.upstream.extra_headers.get("Authorization").map(String::as_str),
            Some("Bearer x")
        );
        assert_eq!(cfg.retention.capacity, None);
        assert_eq!(cfg.retention.max_age, Some(Duration::from_secs(1800)));
        assert_eq!(cfg.poll_interval, Duration::from_secs(60));
        assert_eq!(cfg.bind, "127.0.0.1:9090".parse().expect("addr"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg = parse_relay_config("[cache]\ncapacity = 50\n").expect("parse");
        assert_eq!(cfg.retention.capacity, Some(50));
        assert_eq!(cfg.upstream, UpstreamConfig::default());
        assert!(parse_relay_config("[server]\nbind = \"nope\"\n").is_err());
        assert!(parse_relay_config("not toml [").is_err());
    }

    #[test]
    fn env_overrides_win_and_bad_values_are_ignored() {
        let mut cfg = RelayConfig::default();
        apply_env_overrides(
            &mut cfg,
            lookup_from(&[
                ("DRAWRELAY_UPSTREAM_URL", " https://up.example.com/x "),
                ("DRAWRELAY_PAGE_SIZE", "0"),
                ("DRAWRELAY_CACHE_CAPACITY", "abc"),
                ("DRAWRELAY_RETENTION_SECS", "600"),
                ("DRAWRELAY_POLL_INTERVAL_MS", "10"),
                ("DRAWRELAY_EXTRA_HEADERS", r#"{"X-Token":"t","X-Num":3,"X-Obj":{}}"#),
                ("DRAWRELAY_SIGNATURE", ""),
            ]),
        );
        assert_eq!(cfg.upstream.url, "https://up.example.com/x");
        assert_eq!(cfg.upstream.page_size, 1);
        assert_eq!(cfg.retention.capacity, Some(21));
        assert_eq!(cfg.retention.max_age, Some(Duration::from_secs(600)));
        assert_eq!(cfg.poll_interval, Duration::from_millis(1_000));
        assert_eq!(cfg.upstream.extra_headers.len(), 2);
        assert_eq!(cfg.upstream.extra_headers["X-Num"], "3");
        assert_eq!(cfg.upstream.signature, None);
    }

    #[test]
    fn extra_headers_must_be_an_object() {
        assert!(parse_extra_headers("[1,2]").is_none());
        assert!(parse_extra_headers("{").is_none());
        assert_eq!(parse_extra_headers("{}").map(|m| m.len()), Some(0));
    }
}
