//! Report workflow API handlers
//!
//! GET /report, POST /report/intake, POST /report/test-type,
//! POST /report/extract, PATCH /report/readings/:index,
//! PATCH /report/project, POST /report/phases, POST /report/stage,
//! GET /report/final

use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    models::{ProjectField, ReadingField, SourceFile, Stage, StageTransition, TestType},
    services::{EditOutcome, ExtractionOutcome, ReportSnapshot, ReportView},
    AppState,
};

/// One uploaded field sheet, payload base64-encoded
#[derive(Debug, Deserialize)]
pub struct SourceUpload {
    pub file_name: String,
    pub content_type: String,
    pub data_base64: String,
}

/// POST /report/intake request
#[derive(Debug, Deserialize)]
pub struct IntakeRequest {
    pub sources: Vec<SourceUpload>,
}

/// POST /report/test-type request
#[derive(Debug, Deserialize)]
pub struct TestTypeRequest {
    pub test_type: TestType,
}

/// PATCH field edit request
#[derive(Debug, Deserialize)]
pub struct FieldEditRequest {
    pub field: String,
    /// Raw user input; parsed per field kind
    #[serde(default)]
    pub value: String,
}

/// POST /report/phases request
#[derive(Debug, Deserialize)]
pub struct PhaseInferenceRequest {
    pub enabled: bool,
}

/// POST /report/stage request
#[derive(Debug, Deserialize)]
pub struct StageRequest {
    pub stage: Stage,
}

/// POST /report/extract response
#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    #[serde(flatten)]
    pub outcome: ExtractionOutcome,
    pub report: ReportView,
}

/// Field edit response
#[derive(Debug, Serialize)]
pub struct EditResponse {
    pub outcome: EditOutcome,
    pub report: ReportView,
}

/// POST /report/stage response
#[derive(Debug, Serialize)]
pub struct StageResponse {
    pub transition: StageTransition,
    pub report: ReportView,
}

fn decode_source(upload: SourceUpload) -> ApiResult<SourceFile> {
    let data = STANDARD.decode(upload.data_base64.trim()).map_err(|e| {
        ApiError::BadRequest(format!("{}: payload is not valid base64: {}", upload.file_name, e))
    })?;
    Ok(SourceFile::new(upload.file_name, upload.content_type, data)?)
}

/// GET /report
pub async fn get_report(State(state): State<AppState>) -> Json<ReportView> {
    Json(state.store.view().await)
}

/// POST /report/intake
///
/// Replace the uploaded field sheets.
pub async fn upload_sources(
    State(state): State<AppState>,
    Json(request): Json<IntakeRequest>,
) -> ApiResult<Json<ReportView>> {
    if request.sources.is_empty() {
        return Err(ApiError::BadRequest("No files provided".to_string()));
    }

    let sources = request
        .sources
        .into_iter()
        .map(decode_source)
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(Json(state.store.set_intake(sources).await?))
}

/// POST /report/test-type
pub async fn select_test_type(
    State(state): State<AppState>,
    Json(request): Json<TestTypeRequest>,
) -> ApiResult<Json<ReportView>> {
    Ok(Json(state.store.set_test_type(request.test_type).await?))
}

/// POST /report/extract
///
/// Run OCR extraction over the uploaded sheets. A newer request supersedes
/// this one; the response then reports `superseded`.
pub async fn extract(State(state): State<AppState>) -> ApiResult<Json<ExtractResponse>> {
    let outcome = state.store.run_extraction().await?;
    Ok(Json(ExtractResponse {
        outcome,
        report: state.store.view().await,
    }))
}

/// PATCH /report/readings/:index
pub async fn edit_reading(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(request): Json<FieldEditRequest>,
) -> ApiResult<Json<EditResponse>> {
    let field: ReadingField = request.field.parse().map_err(ApiError::BadRequest)?;
    let (outcome, report) = state.store.edit_reading(index, field, &request.value).await?;
    Ok(Json(EditResponse { outcome, report }))
}

/// PATCH /report/project
pub async fn edit_project(
    State(state): State<AppState>,
    Json(request): Json<FieldEditRequest>,
) -> ApiResult<Json<EditResponse>> {
    let field: ProjectField = request.field.parse().map_err(ApiError::BadRequest)?;
    let (outcome, report) = state.store.edit_project(field, &request.value).await?;
    Ok(Json(EditResponse { outcome, report }))
}

/// POST /report/phases
pub async fn set_phase_inference(
    State(state): State<AppState>,
    Json(request): Json<PhaseInferenceRequest>,
) -> ApiResult<Json<ReportView>> {
    Ok(Json(state.store.set_phase_inference(request.enabled).await?))
}

/// POST /report/stage
///
/// Moving to `intake` discards the report.
pub async fn change_stage(
    State(state): State<AppState>,
    Json(request): Json<StageRequest>,
) -> ApiResult<Json<StageResponse>> {
    let transition = state.store.transition(request.stage).await?;
    Ok(Json(StageResponse {
        transition,
        report: state.store.view().await,
    }))
}

/// GET /report/final
pub async fn get_final_report(State(state): State<AppState>) -> ApiResult<Json<ReportSnapshot>> {
    Ok(Json(state.store.final_snapshot().await?))
}

/// Build report workflow routes
pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/report", get(get_report))
        .route("/report/intake", post(upload_sources))
        .route("/report/test-type", post(select_test_type))
        .route("/report/extract", post(extract))
        .route("/report/readings/:index", patch(edit_reading))
        .route("/report/project", patch(edit_project))
        .route("/report/phases", post(set_phase_inference))
        .route("/report/stage", post(change_stage))
        .route("/report/final", get(get_final_report))
}
