use crate::config::Config;
use crate::logger::RequestLogEntry;
use crate::stats::StatsCollector;
use crate::sync::SyncClient;
use crate::worker::Dispatcher;
use axum::{
    extract::{Json as AxumJson, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc::Sender;

struct ApiState {
    stats: Arc<StatsCollector>,
    dispatcher: Dispatcher,
    config: Config,
    sync: Arc<SyncClient>,
    refresh_sender: Sender<()>,
    logs_buffer: Arc<RwLock<VecDeque<RequestLogEntry>>>,
}

#[allow(clippy::too_many_arguments)]
pub async fn start_api_server(
    stats: Arc<StatsCollector>,
    dispatcher: Dispatcher,
    config: Config,
    sync: Arc<SyncClient>,
    refresh_sender: Sender<()>,
    logs_buffer: Arc<RwLock<VecDeque<RequestLogEntry>>>,
    port: u16,
) {
    let state = Arc::new(ApiState {
        stats,
        dispatcher,
        config,
        sync,
        refresh_sender,
        logs_buffer,
    });

    let app = api_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("API server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

fn api_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/stats", get(get_stats))
        .route("/api/config", get(get_config))
        .route("/api/logs", get(get_logs))
        .route("/api/adblock", post(set_adblock))
        .route("/api/refresh", post(trigger_refresh))
        .route("/api/pause", post(pause_blocking))
        .route("/api/resume", post(resume_blocking))
        .with_state(state)
}

async fn get_status(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "adblock_enabled": state.dispatcher.adblock().is_enabled(),
        "blocking_active": state.dispatcher.blocking_state().is_blocking_active(),
        "pause_remaining_secs": state.dispatcher.blocking_state().pause_remaining_secs(),
    }))
}

async fn get_stats(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(state.stats.get_snapshot())
}

async fn get_config(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(state.config.clone())
}

async fn get_logs(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let buffer = state.logs_buffer.read().unwrap();
    // Newest first
    let logs: Vec<RequestLogEntry> = buffer.iter().rev().cloned().collect();
    Json(logs)
}

#[derive(serde::Deserialize)]
struct AdblockRequest {
    enabled: bool,
}

async fn set_adblock(
    State(state): State<Arc<ApiState>>,
    AxumJson(payload): AxumJson<AdblockRequest>,
) -> impl IntoResponse {
    state.sync.set_adblock_enabled(payload.enabled).await;
    Json(serde_json::json!({ "status": "ok", "enabled": payload.enabled }))
}

async fn trigger_refresh(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let _ = state.refresh_sender.send(()).await;
    Json(serde_json::json!({ "status": "refresh_triggered" }))
}

#[derive(serde::Deserialize)]
struct PauseRequest {
    duration_minutes: u64,
}

async fn pause_blocking(
    State(state): State<Arc<ApiState>>,
    AxumJson(payload): AxumJson<PauseRequest>,
) -> impl IntoResponse {
    let duration = std::time::Duration::from_secs(payload.duration_minutes * 60);
    state.dispatcher.blocking_state().pause_blocking(duration);
    Json(serde_json::json!({ "status": "paused", "duration_min": payload.duration_minutes }))
}

async fn resume_blocking(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    state.dispatcher.blocking_state().resume_blocking();
    Json(serde_json::json!({ "status": "resumed" }))
}
