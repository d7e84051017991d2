// src/api.rs
// HTTP trigger surface: liveness on GET, the reconciliation run on POST.

use std::sync::Arc;

use shuttle_axum::axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::models::RunSummary;
use crate::orchestrator::Orchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/health", get(|| async { "OK" }))
        .route("/ingest", post(trigger_ingestion))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn liveness() -> &'static str {
    "Grant ingestion engine ready."
}

#[derive(serde::Serialize)]
struct IngestResponse {
    success: bool,
    #[serde(flatten)]
    summary: RunSummary,
}

#[derive(serde::Serialize)]
struct IngestError {
    success: bool,
    error: String,
}

/// Runs one reconciliation cycle. Partial per-grant failures still answer
/// 200 with their counts; only a feed fetch failure becomes a 500.
async fn trigger_ingestion(
    State(state): State<AppState>,
) -> Result<Json<IngestResponse>, (StatusCode, Json<IngestError>)> {
    match state.orchestrator.run().await {
        Ok(summary) => Ok(Json(IngestResponse { success: true, summary })),
        Err(e) => {
            error!(error = ?e, "ingestion run failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(IngestError {
                    success: false,
                    error: format!("{e:#}"),
                }),
            ))
        }
    }
}
