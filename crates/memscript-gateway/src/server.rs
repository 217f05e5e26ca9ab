//! HTTP server: execute endpoint, health, and script-backed stats.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use memscript_core::{ExecuteRequest, ExecutionOutcome};
use memscript_engine::{Engine, ExecuteOptions};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// The fixed script behind `GET /v1/stats`. One output line: entity count,
/// space, relation count.
const STATS_SCRIPT: &str =
    r#"let g = graph.read_graph(); log(str(len(g.entities)) + " " + str(len(g.relations)));"#;

pub struct AppState {
    pub engine: Engine,
    pub started_at: std::time::Instant,
}

pub async fn start_gateway(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);

    info!("memscript gateway v{} starting", env!("CARGO_PKG_VERSION"));
    info!("  listening on: http://{}", addr);
    info!("  execute:      POST /v1/execute");
    info!("  stats:        GET  /v1/stats");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/execute", post(execute_handler))
        .route("/v1/stats", get(stats_handler))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .with_state(state)
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptimeSecs": state.started_at.elapsed().as_secs(),
    }))
}

/// One script in, one outcome out. A failed script is still HTTP 200: the
/// failure is data for the caller, not a transport error.
async fn execute_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExecuteRequest>,
) -> Json<ExecutionOutcome> {
    info!(
        "execute: {} bytes, timeout={:?}ms",
        request.script.len(),
        request.timeout_ms
    );
    let outcome = state
        .engine
        .execute(
            &request.script,
            ExecuteOptions {
                timeout_ms: request.timeout_ms,
            },
        )
        .await;
    Json(outcome)
}

async fn stats_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let outcome = state
        .engine
        .execute(STATS_SCRIPT, ExecuteOptions::default())
        .await;
    match parse_stats(&outcome) {
        Some((entities, relations)) => (
            StatusCode::OK,
            Json(json!({ "entities": entities, "relations": relations })),
        ),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": outcome.error.unwrap_or_else(|| "no output".into()) })),
        ),
    }
}

fn parse_stats(outcome: &ExecutionOutcome) -> Option<(u64, u64)> {
    if !outcome.success {
        return None;
    }
    let line = outcome.output.first()?;
    let mut parts = line.split_whitespace();
    let entities = parts.next()?.parse().ok()?;
    let relations = parts.next()?.parse().ok()?;
    Some((entities, relations))
}
