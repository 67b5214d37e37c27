use std::sync::OnceLock;

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::EnvFilter;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn init_tracing(service_name: &str) -> tracing_appender::non_blocking::WorkerGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{service_name}=info,info")));

    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_target(true)
        .try_init();

    guard
}

pub fn init_metrics() -> Result<PrometheusHandle> {
    if let Some(handle) = PROM_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("install prometheus recorder")?;
    describe_relay_metrics();

    let _ = PROM_HANDLE.set(handle.clone());
    Ok(handle)
}

fn describe_relay_metrics() {
    describe_counter!("relay.cycle.total", "Poll cycles started");
    describe_counter!("relay.cycle.skipped", "Ticks dropped because a cycle was in flight");
    describe_counter!("relay.cycle.failed", "Cycles that left the cache untouched");
    describe_counter!("relay.cycle.admitted", "Entries newly admitted to the cache");
    describe_counter!("relay.mapper.rejected", "Upstream records the mapper dropped");
    describe_gauge!("relay.cache.size", "Entries currently cached");
    describe_histogram!(
        "relay.fetch.latency_ms",
        Unit::Milliseconds,
        "Upstream round trip"
    );
}
