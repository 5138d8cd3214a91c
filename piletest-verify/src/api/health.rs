//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// OCR collaborator status
#[derive(Debug, Serialize)]
pub struct ExtractorHealth {
    pub name: String,
    /// Reachable and ready to extract
    pub available: bool,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" when the OCR service is unavailable
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub extractor: ExtractorHealth,
    /// Last user-visible error on the report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let extractor = state.store.extractor();
    let available = extractor.is_available().await;
    let last_error = state.store.snapshot().await.error_message;

    Json(HealthResponse {
        status: if available { "ok" } else { "degraded" }.to_string(),
        module: "piletest-verify".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        extractor: ExtractorHealth {
            name: extractor.name().to_string(),
            available,
        },
        last_error,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
