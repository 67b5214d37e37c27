use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use core_types::DrawEntry;
use draw_predictor::{evaluate_all, window_blocks, HeuristicReport, WindowBlock};
use infra_clock::age_ms;
use serde::{Deserialize, Serialize};

use crate::poll_runtime::UpstreamDebug;
use crate::state::AppState;

pub(crate) fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/history", get(history))
        .route("/predictions", get(predictions))
        .route("/health", get(health))
        .route("/debug-upstream", get(debug_upstream))
        .route("/metrics", get(metrics))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryResp {
    updated_at: Option<i64>,
    size: usize,
    list: Vec<DrawEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictionsResp {
    updated_at: Option<i64>,
    predictions: Vec<WindowBlock>,
    heuristics: Vec<HeuristicReport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResp {
    ok: bool,
    cache_size: usize,
    last_update: Option<i64>,
    last_update_age_ms: Option<i64>,
    cycles: u64,
    skipped: u64,
    failures: u64,
    admitted: u64,
    busy: bool,
}

async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<HistoryResp> {
    let snap = state.cache.snapshot();
    let take = query.limit.unwrap_or(snap.len()).min(snap.len());
    Json(HistoryResp {
        updated_at: snap.updated_at_ms,
        size: snap.len(),
        list: snap.entries[..take].to_vec(),
    })
}

async fn predictions(State(state): State<AppState>) -> Json<PredictionsResp> {
    let snap = state.cache.snapshot();
    let history = snap.values();
    Json(PredictionsResp {
        updated_at: snap.updated_at_ms,
        predictions: window_blocks(&history),
        heuristics: evaluate_all(&history),
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthResp> {
    let stats = state.poller.stats();
    let last_update = state.cache.last_merge_ms();
    Json(HealthResp {
        ok: true,
        cache_size: state.cache.len(),
        last_update,
        last_update_age_ms: age_ms(state.cache.now_ms(), last_update),
        cycles: stats.cycles(),
        skipped: stats.skipped(),
        failures: stats.failed(),
        admitted: stats.admitted(),
        busy: state.poller.is_busy(),
    })
}

async fn debug_upstream(State(state): State<AppState>) -> Json<UpstreamDebug> {
    Json(state.poller.stats().upstream_debug())
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        state
            .prometheus
            .as_ref()
            .map(|handle| handle.render())
            .unwrap_or_default(),
    )
}
