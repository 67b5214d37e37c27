use std::sync::Arc;

use anyhow::{Context, Result};
use feed_upstream::HttpUpstream;
use observability::{init_metrics, init_tracing};
use rolling_cache::RollingCache;

use crate::config_loader::load_relay_config;
use crate::control_api::build_router;
use crate::poll_runtime::Poller;
use crate::state::AppState;

pub(super) async fn async_main() -> Result<()> {
    let _guard = init_tracing("relay_runner");
    let prometheus = match init_metrics() {
        Ok(handle) => Some(handle),
        Err(err) => {
            tracing::warn!(?err, "prometheus recorder unavailable; /metrics will be empty");
            None
        }
    };

    let cfg = load_relay_config();
    let upstream = Arc::new(HttpUpstream::new(cfg.upstream.clone())?);
    let cache = Arc::new(RollingCache::new(cfg.retention));
    tracing::info!(
        url = %upstream.cfg().url,
        page_size = upstream.cfg().page_size,
        timeout_ms = upstream.cfg().timeout.as_millis() as u64,
        capacity = ?cache.policy().capacity,
        max_age = ?cache.policy().max_age,
        poll_interval_ms = cfg.poll_interval.as_millis() as u64,
        "relay config loaded"
    );

    let poller = Arc::new(Poller::new(upstream, cache));
    let scheduler = poller.clone().spawn(cfg.poll_interval);

    let app = build_router(AppState::new(poller, prometheus));
    let listener = tokio::net::TcpListener::bind(cfg.bind)
        .await
        .with_context(|| format!("bind query api on {}", cfg.bind))?;
    tracing::info!(addr = %cfg.bind, "query api listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.abort();
    tracing::info!("relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(?err, "ctrl_c listener failed");
    }
    tracing::info!("shutdown requested");
}
