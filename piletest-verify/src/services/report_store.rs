//! Report store
//!
//! Owns the one in-memory report and serializes every mutation through a
//! `RwLock`. Extraction follows last-request-wins:
//! - each run takes a ticket from a monotonically increasing generation
//! - a newer run, new sources, or a reset bump the generation and cancel the
//!   in-flight run's token
//! - a result commits only if its ticket is still current
//!
//! The lock is never held across the extractor call.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use piletest_common::events::{EventBus, ReportEvent};

use crate::error::EngineError;
use crate::models::{
    check_transition, ProjectField, ProjectRecord, ReadingField, ReadingRecord, Report,
    SourceFile, Stage, StageTransition, TestType,
};
use crate::services::derived_metrics::DerivedResults;
use crate::services::edit_merger::EditOutcome;
use crate::services::field_classifier::ReviewSummary;
use crate::services::sheet_checks::SheetWarning;
use crate::types::Extractor;

/// Result of an extraction run that did not fail
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    /// Batch committed into the report
    Committed {
        ticket: u64,
        reading_count: usize,
        /// Set when the report advanced to Verify
        transition: Option<StageTransition>,
    },
    /// A newer request or a reset made this result stale; it was dropped
    Superseded { ticket: u64 },
}

/// Consistency warning with its display text
#[derive(Debug, Clone, Serialize)]
pub struct ReviewWarning {
    #[serde(flatten)]
    pub detail: SheetWarning,
    pub message: String,
}

/// Report plus everything derived from it
#[derive(Debug, Clone, Serialize)]
pub struct ReportView {
    pub report: Report,
    pub derived: DerivedResults,
    pub review: ReviewSummary,
    pub warnings: Vec<ReviewWarning>,
}

impl ReportView {
    fn of(report: &Report) -> Self {
        let derived = report.derived();
        let warnings = report
            .warnings(&derived)
            .into_iter()
            .map(|detail| ReviewWarning {
                message: detail.message(),
                detail,
            })
            .collect();
        Self {
            review: report.review_summary(),
            report: report.clone(),
            derived,
            warnings,
        }
    }
}

/// Read-only finalized report for downstream rendering
#[derive(Debug, Clone, Serialize)]
pub struct ReportSnapshot {
    pub report_id: Uuid,
    pub test_type: Option<TestType>,
    pub project: ProjectRecord,
    pub readings: Vec<ReadingRecord>,
    pub derived: DerivedResults,
    pub generated_at: DateTime<Utc>,
}

struct StoreState {
    report: Report,
    generation: u64,
    in_flight: Option<CancellationToken>,
}

impl StoreState {
    /// Invalidate any in-flight extraction
    fn supersede(&mut self) {
        self.generation += 1;
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
    }
}

/// Shared handle to the report
#[derive(Clone)]
pub struct ReportStore {
    inner: Arc<RwLock<StoreState>>,
    extractor: Arc<dyn Extractor>,
    event_bus: EventBus,
}

impl ReportStore {
    pub fn new(extractor: Arc<dyn Extractor>, event_bus: EventBus) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreState {
                report: Report::new(),
                generation: 0,
                in_flight: None,
            })),
            extractor,
            event_bus,
        }
    }

    pub fn extractor(&self) -> &Arc<dyn Extractor> {
        &self.extractor
    }

    /// Clone of the current report
    pub async fn snapshot(&self) -> Report {
        self.inner.read().await.report.clone()
    }

    pub async fn view(&self) -> ReportView {
        ReportView::of(&self.inner.read().await.report)
    }

    /// Replace uploaded sources; an in-flight extraction becomes stale
    pub async fn set_intake(&self, sources: Vec<SourceFile>) -> Result<ReportView, EngineError> {
        let mut state = self.inner.write().await;
        state.report.set_sources(sources)?;
        state.supersede();
        state.report.loading = false;
        info!(sources = state.report.sources.len(), "Field sheets uploaded");
        Ok(ReportView::of(&state.report))
    }

    pub async fn set_test_type(&self, test_type: TestType) -> Result<ReportView, EngineError> {
        let mut state = self.inner.write().await;
        state.report.select_test_type(test_type)?;
        info!(test_type = %test_type, "Test type selected");
        Ok(ReportView::of(&state.report))
    }

    /// Run one extraction against the current sources
    ///
    /// The ticket is taken before the availability check so a slow check
    /// cannot outrank a newer request.
    pub async fn run_extraction(&self) -> Result<ExtractionOutcome, EngineError> {
        let token = CancellationToken::new();
        let ticket = {
            let mut state = self.inner.write().await;
            state.report.ensure_extractable()?;
            state.supersede();
            state.in_flight = Some(token.clone());
            state.generation
        };

        let available = tokio::select! {
            _ = token.cancelled() => return Ok(self.discard(ticket, None)),
            available = self.extractor.is_available() => available,
        };

        let sources = {
            let mut state = self.inner.write().await;
            if state.generation != ticket {
                return Ok(self.discard(ticket, Some(state.generation)));
            }
            if !available {
                state.in_flight = None;
                state.report.loading = false;
                warn!(extractor = self.extractor.name(), "Extraction skipped: OCR service unavailable");
                return Err(EngineError::ExtractionUnavailable);
            }
            state.report.loading = true;
            state.report.error_message = None;
            state.report.sources.clone()
        };

        info!(ticket, sources = sources.len(), "Extraction started");
        self.event_bus.emit_lossy(ReportEvent::ExtractionStarted {
            ticket,
            source_count: sources.len(),
            timestamp: Utc::now(),
        });

        let result = tokio::select! {
            _ = token.cancelled() => None,
            result = self.extractor.extract(&sources) => Some(result),
        };

        let mut state = self.inner.write().await;
        let result = match result {
            Some(result) if state.generation == ticket => result,
            _ => return Ok(self.discard(ticket, Some(state.generation))),
        };
        state.in_flight = None;

        match result {
            Ok(batch) => {
                let reading_count = batch.readings.len();
                state.report.commit_extraction(batch);

                let report = &mut state.report;
                let transition = if check_transition(report.stage, Stage::Verify, &report.guard_context()).is_ok() {
                    Some(report.transition_to(Stage::Verify)?)
                } else {
                    None
                };

                info!(ticket, reading_count, advanced = transition.is_some(), "Extraction committed");
                self.event_bus.emit_lossy(ReportEvent::ExtractionCommitted {
                    ticket,
                    reading_count,
                    timestamp: Utc::now(),
                });
                if let Some(t) = &transition {
                    self.emit_stage_changed(t);
                }

                Ok(ExtractionOutcome::Committed {
                    ticket,
                    reading_count,
                    transition,
                })
            }
            Err(e) => {
                let err = EngineError::from(e);
                warn!(ticket, error = %err, "Extraction failed");
                state.report.fail_extraction(err.to_string());
                self.event_bus.emit_lossy(ReportEvent::ExtractionFailed {
                    ticket,
                    message: err.to_string(),
                    timestamp: Utc::now(),
                });
                Err(err)
            }
        }
    }

    fn discard(&self, ticket: u64, current: Option<u64>) -> ExtractionOutcome {
        debug!(ticket, current, "Discarding stale extraction result");
        self.event_bus.emit_lossy(ReportEvent::ExtractionDiscarded {
            ticket,
            timestamp: Utc::now(),
        });
        ExtractionOutcome::Superseded { ticket }
    }

    pub async fn edit_reading(
        &self,
        index: usize,
        field: ReadingField,
        raw: &str,
    ) -> Result<(EditOutcome, ReportView), EngineError> {
        let mut state = self.inner.write().await;
        let outcome = state.report.edit_reading(index, field, raw)?;

        debug!(index, field = field.as_str(), changed = outcome.changed, "Reading edited");
        self.event_bus.emit_lossy(ReportEvent::FieldEdited {
            reading_index: Some(index),
            field: field.as_str().to_string(),
            changed: outcome.changed,
            timestamp: Utc::now(),
        });
        if outcome.invalidates_phase && state.report.phase_inference_enabled {
            self.event_bus.emit_lossy(ReportEvent::PhasesInferred {
                enabled: true,
                reading_count: state.report.readings.len(),
                timestamp: Utc::now(),
            });
        }

        Ok((outcome, ReportView::of(&state.report)))
    }

    pub async fn edit_project(
        &self,
        field: ProjectField,
        raw: &str,
    ) -> Result<(EditOutcome, ReportView), EngineError> {
        let mut state = self.inner.write().await;
        let outcome = state.report.edit_project(field, raw)?;

        debug!(field = field.as_str(), changed = outcome.changed, "Project field edited");
        self.event_bus.emit_lossy(ReportEvent::FieldEdited {
            reading_index: None,
            field: field.as_str().to_string(),
            changed: outcome.changed,
            timestamp: Utc::now(),
        });

        Ok((outcome, ReportView::of(&state.report)))
    }

    pub async fn set_phase_inference(&self, enabled: bool) -> Result<ReportView, EngineError> {
        let mut state = self.inner.write().await;
        state.report.set_phase_inference(enabled)?;

        info!(enabled, "Phase inference toggled");
        self.event_bus.emit_lossy(ReportEvent::PhasesInferred {
            enabled,
            reading_count: state.report.readings.len(),
            timestamp: Utc::now(),
        });

        Ok(ReportView::of(&state.report))
    }

    /// Move the workflow; moving to Intake discards the report
    pub async fn transition(&self, to: Stage) -> Result<StageTransition, EngineError> {
        let mut state = self.inner.write().await;
        let transition = state.report.transition_to(to).map_err(|e| {
            warn!(error = %e, "Stage change rejected");
            e
        })?;

        if to == Stage::Intake {
            state.supersede();
            info!("Report reset");
            self.event_bus.emit_lossy(ReportEvent::ReportReset {
                timestamp: Utc::now(),
            });
        }
        self.emit_stage_changed(&transition);

        Ok(transition)
    }

    pub async fn reset(&self) -> Result<StageTransition, EngineError> {
        self.transition(Stage::Intake).await
    }

    /// Read-only report for rendering; only available once finalized
    pub async fn final_snapshot(&self) -> Result<ReportSnapshot, EngineError> {
        let state = self.inner.read().await;
        let report = &state.report;
        if report.stage != Stage::Finalize {
            return Err(EngineError::InvalidStage {
                operation: "Reading the final report",
                stage: report.stage,
            });
        }

        Ok(ReportSnapshot {
            report_id: report.id,
            test_type: report.test_type,
            project: report.project.clone(),
            readings: report.readings.clone(),
            derived: report.derived(),
            generated_at: Utc::now(),
        })
    }

    fn emit_stage_changed(&self, transition: &StageTransition) {
        info!(
            old_stage = %transition.old_stage,
            new_stage = %transition.new_stage,
            "Stage changed"
        );
        self.event_bus.emit_lossy(ReportEvent::StageChanged {
            old_stage: transition.old_stage,
            new_stage: transition.new_stage,
            timestamp: transition.transitioned_at,
        });
    }
}
