//! piletest-verify library interface
//!
//! OCR-result reconciliation engine for pile load test field sheets:
//! confidence-scored extraction results are corrected by a reviewer, test
//! phases are inferred from the pressure series, and settlement results are
//! derived for the final report.

pub mod api;
pub mod error;
pub mod models;
pub mod services;
pub mod types;

pub use crate::error::{ApiError, ApiResult, EngineError};

use axum::{routing::get, Router};
use chrono::{DateTime, Utc};
use piletest_common::events::EventBus;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::ReportStore;
use crate::types::Extractor;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The report under verification
    pub store: ReportStore,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(extractor: Arc<dyn Extractor>, event_bus: EventBus) -> Self {
        Self {
            store: ReportStore::new(extractor, event_bus.clone()),
            event_bus,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::report_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
