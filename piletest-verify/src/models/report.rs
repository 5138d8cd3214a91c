//! Report aggregate
//!
//! The single mutable unit of truth for one verification session. Every
//! mutation is a named method here; the store serializes access to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{
    check_transition, GuardContext, ProjectField, ProjectRecord, ReadingField, ReadingRecord,
    SourceFile, Stage, StageTransition,
};
use crate::services::derived_metrics::{self, DerivedResults};
use crate::services::edit_merger::{apply_project_edit, apply_reading_edit, EditOutcome};
use crate::services::field_classifier::ReviewSummary;
use crate::services::phase_inference::{clear_phases, infer_phases};
use crate::services::sheet_checks::{self, SheetWarning};
use crate::types::ExtractionBatch;

/// Pile load test type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestType {
    /// Initial vertical pile load test
    Ivplt,
    /// Routine vertical pile load test
    Rvplt,
    Pullout,
    Lateral,
}

impl TestType {
    pub const ALL: [TestType; 4] = [
        TestType::Ivplt,
        TestType::Rvplt,
        TestType::Pullout,
        TestType::Lateral,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TestType::Ivplt => "IVPLT",
            TestType::Rvplt => "RVPLT",
            TestType::Pullout => "PULLOUT",
            TestType::Lateral => "LATERAL",
        }
    }

    /// Vertical tests carry the codified settlement limit
    pub fn is_vertical(self) -> bool {
        matches!(self, TestType::Ivplt | TestType::Rvplt)
    }

    /// Recognize a test type in free header text ("Type of test: RVPLT")
    pub fn from_sheet_text(text: &str) -> Option<Self> {
        let normalized: String = text
            .to_uppercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        TestType::ALL
            .into_iter()
            .find(|t| normalized.contains(t.as_str()))
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TestType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown test type: {}", s))
    }
}

/// One pile load test report under verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub project: ProjectRecord,
    pub readings: Vec<ReadingRecord>,
    pub test_type: Option<TestType>,
    pub stage: Stage,
    pub sources: Vec<SourceFile>,
    pub extraction_committed: bool,
    pub phase_inference_enabled: bool,
    /// An extraction is in flight
    pub loading: bool,
    /// Last user-visible error
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

impl Report {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            project: ProjectRecord::default(),
            readings: Vec::new(),
            test_type: None,
            stage: Stage::Intake,
            sources: Vec::new(),
            extraction_committed: false,
            phase_inference_enabled: true,
            loading: false,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    fn require_stage(&self, allowed: &[Stage], operation: &'static str) -> Result<(), EngineError> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(EngineError::InvalidStage {
                operation,
                stage: self.stage,
            })
        }
    }

    /// Replace the uploaded sources; any previous extraction no longer applies
    pub fn set_sources(&mut self, sources: Vec<SourceFile>) -> Result<(), EngineError> {
        self.require_stage(&[Stage::Intake], "Uploading field sheets")?;
        self.sources = sources;
        self.project = ProjectRecord::default();
        self.readings.clear();
        self.extraction_committed = false;
        self.error_message = None;
        Ok(())
    }

    pub fn select_test_type(&mut self, test_type: TestType) -> Result<(), EngineError> {
        self.require_stage(&[Stage::Intake, Stage::Verify], "Selecting the test type")?;
        self.test_type = Some(test_type);
        Ok(())
    }

    /// Check that an extraction may be started from the current state
    pub fn ensure_extractable(&self) -> Result<(), EngineError> {
        self.require_stage(&[Stage::Intake], "Extraction")?;
        if self.sources.is_empty() {
            return Err(EngineError::InvalidSource(
                "upload at least one field sheet first".to_string(),
            ));
        }
        Ok(())
    }

    /// Replace project and readings with a successful extraction
    pub fn commit_extraction(&mut self, batch: ExtractionBatch) {
        if self.test_type.is_none() {
            self.test_type = batch.project.detected_test_type();
        }
        self.project = batch.project;
        self.readings = batch.readings;
        self.extraction_committed = true;
        self.loading = false;
        self.error_message = None;
        self.refresh_phases();
    }

    /// Record a failed extraction without touching report data
    pub fn fail_extraction(&mut self, message: String) {
        self.loading = false;
        self.error_message = Some(message);
    }

    pub fn edit_reading(
        &mut self,
        index: usize,
        field: ReadingField,
        raw: &str,
    ) -> Result<EditOutcome, EngineError> {
        self.require_stage(&[Stage::Verify], "Editing readings")?;
        let record = self
            .readings
            .get_mut(index)
            .ok_or(EngineError::ReadingNotFound(index))?;

        let outcome = apply_reading_edit(record, field, raw);
        if outcome.invalidates_phase && self.phase_inference_enabled {
            self.refresh_phases();
        }
        Ok(outcome)
    }

    pub fn edit_project(&mut self, field: ProjectField, raw: &str) -> Result<EditOutcome, EngineError> {
        self.require_stage(&[Stage::Verify], "Editing project details")?;
        Ok(apply_project_edit(&mut self.project, field, raw))
    }

    /// Toggle phase inference; on recomputes from scratch, off clears phases
    pub fn set_phase_inference(&mut self, enabled: bool) -> Result<(), EngineError> {
        self.require_stage(&[Stage::Intake, Stage::Verify], "Changing phase inference")?;
        self.phase_inference_enabled = enabled;
        self.refresh_phases();
        Ok(())
    }

    pub fn refresh_phases(&mut self) {
        if self.phase_inference_enabled {
            self.readings = infer_phases(&self.readings);
        } else {
            clear_phases(&mut self.readings);
        }
    }

    pub fn guard_context(&self) -> GuardContext {
        GuardContext {
            source_count: self.sources.len(),
            test_type_selected: self.test_type.is_some(),
            extraction_committed: self.extraction_committed,
            reading_count: self.readings.len(),
        }
    }

    /// Move to another stage
    ///
    /// A rejected move sets `error_message` and leaves everything else as is.
    /// Moving to Intake discards the whole report.
    pub fn transition_to(&mut self, to: Stage) -> Result<StageTransition, EngineError> {
        let from = self.stage;
        if let Err(err) = check_transition(from, to, &self.guard_context()) {
            self.error_message = Some(err.to_string());
            return Err(err);
        }

        if to == Stage::Intake {
            *self = Report::new();
        } else {
            self.stage = to;
            self.error_message = None;
        }
        Ok(StageTransition::new(from, to))
    }

    pub fn derived(&self) -> DerivedResults {
        derived_metrics::compute(&self.project, &self.readings, self.test_type)
    }

    pub fn review_summary(&self) -> ReviewSummary {
        ReviewSummary::for_records(&self.project, &self.readings)
    }

    /// Consistency warnings for the reviewer
    pub fn warnings(&self, derived: &DerivedResults) -> Vec<SheetWarning> {
        let mut warnings = sheet_checks::chronology_warnings(&self.readings);
        warnings.extend(sheet_checks::load_target_warning(
            derived.max_applied_load_mt,
            derived.test_load_mt,
        ));
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Phase;
    use crate::types::ConfidenceValue;

    fn reading(pressure: f64) -> ReadingRecord {
        ReadingRecord {
            pressure: ConfidenceValue::new(Some(pressure), 0.8),
            ..Default::default()
        }
    }

    fn batch(pressures: &[f64]) -> ExtractionBatch {
        ExtractionBatch {
            project: ProjectRecord::default(),
            readings: pressures.iter().map(|p| reading(*p)).collect(),
            page_count: 1,
        }
    }

    fn verify_report(pressures: &[f64]) -> Report {
        let mut report = Report::new();
        report
            .set_sources(vec![SourceFile::new("p1.png", "image/png", vec![1]).unwrap()])
            .unwrap();
        report.select_test_type(TestType::Ivplt).unwrap();
        report.commit_extraction(batch(pressures));
        report.transition_to(Stage::Verify).unwrap();
        report
    }

    #[test]
    fn test_test_type_from_sheet_text() {
        assert_eq!(TestType::from_sheet_text("IVPLT"), Some(TestType::Ivplt));
        assert_eq!(TestType::from_sheet_text("Type of test: rvplt"), Some(TestType::Rvplt));
        assert_eq!(TestType::from_sheet_text("Pull-out test"), Some(TestType::Pullout));
        assert_eq!(TestType::from_sheet_text("static"), None);
    }

    #[test]
    fn test_test_type_parse() {
        assert_eq!("lateral".parse::<TestType>(), Ok(TestType::Lateral));
        assert!("axial".parse::<TestType>().is_err());
        assert!(TestType::Rvplt.is_vertical());
        assert!(!TestType::Pullout.is_vertical());
    }

    #[test]
    fn test_commit_infers_phases_and_detects_test_type() {
        let mut report = Report::new();
        let mut extracted = batch(&[0.0, 50.0, 25.0]);
        extracted.project.test_type = ConfidenceValue::new(Some("RVPLT".into()), 0.9);
        report.commit_extraction(extracted);

        assert!(report.extraction_committed);
        assert_eq!(report.test_type, Some(TestType::Rvplt));
        assert_eq!(report.readings[2].phase, Some(Phase::Unloading));
    }

    #[test]
    fn test_user_selected_test_type_wins_over_detection() {
        let mut report = Report::new();
        report.select_test_type(TestType::Lateral).unwrap();
        let mut extracted = batch(&[0.0]);
        extracted.project.test_type = ConfidenceValue::new(Some("IVPLT".into()), 0.9);
        report.commit_extraction(extracted);
        assert_eq!(report.test_type, Some(TestType::Lateral));
    }

    #[test]
    fn test_edit_requires_verify_stage() {
        let mut report = Report::new();
        report.commit_extraction(batch(&[10.0]));
        let err = report.edit_reading(0, ReadingField::Pressure, "12").unwrap_err();
        assert!(matches!(err, EngineError::InvalidStage { .. }));
    }

    #[test]
    fn test_edit_out_of_range() {
        let mut report = verify_report(&[10.0]);
        let err = report.edit_reading(5, ReadingField::Pressure, "12").unwrap_err();
        assert!(matches!(err, EngineError::ReadingNotFound(5)));
    }

    #[test]
    fn test_pressure_edit_reinfers_phases() {
        let mut report = verify_report(&[0.0, 50.0, 100.0]);
        assert_eq!(report.readings[2].phase, Some(Phase::Loading));

        let outcome = report.edit_reading(2, ReadingField::Pressure, "40").unwrap();
        assert!(outcome.invalidates_phase);
        assert_eq!(report.readings[2].phase, Some(Phase::Unloading));
    }

    #[test]
    fn test_pressure_edit_with_inference_off_leaves_phase_absent() {
        let mut report = verify_report(&[0.0, 50.0]);
        report.set_phase_inference(false).unwrap();
        report.edit_reading(1, ReadingField::Pressure, "20").unwrap();
        assert!(report.readings.iter().all(|r| r.phase.is_none()));

        report.set_phase_inference(true).unwrap();
        assert_eq!(report.readings[1].phase, Some(Phase::Loading));
    }

    #[test]
    fn test_illegal_transition_sets_error_and_keeps_state() {
        let mut report = verify_report(&[]);
        let err = report.transition_to(Stage::Finalize).unwrap_err();
        assert!(matches!(err, EngineError::IllegalTransition { .. }));
        assert_eq!(report.stage, Stage::Verify);
        assert!(report.error_message.is_some());
    }

    #[test]
    fn test_successful_transition_clears_error() {
        let mut report = verify_report(&[10.0]);
        report.error_message = Some("old".into());
        let transition = report.transition_to(Stage::Finalize).unwrap();
        assert_eq!(transition.old_stage, Stage::Verify);
        assert_eq!(transition.new_stage, Stage::Finalize);
        assert_eq!(report.error_message, None);
    }

    #[test]
    fn test_finalize_is_read_only() {
        let mut report = verify_report(&[10.0]);
        report.transition_to(Stage::Finalize).unwrap();
        assert!(report.edit_project(ProjectField::Location, "Site A").is_err());
        assert!(report.set_phase_inference(false).is_err());

        report.transition_to(Stage::Verify).unwrap();
        assert!(report.edit_project(ProjectField::Location, "Site A").is_ok());
    }

    #[test]
    fn test_reset_discards_everything() {
        let mut report = verify_report(&[10.0, 20.0]);
        let old_id = report.id;
        let transition = report.transition_to(Stage::Intake).unwrap();

        assert_eq!(transition.old_stage, Stage::Verify);
        assert_eq!(report.stage, Stage::Intake);
        assert!(report.readings.is_empty());
        assert!(report.sources.is_empty());
        assert_eq!(report.test_type, None);
        assert_ne!(report.id, old_id);
    }

    #[test]
    fn test_new_sources_invalidate_extraction() {
        let mut report = Report::new();
        report.commit_extraction(batch(&[10.0]));
        report
            .set_sources(vec![SourceFile::new("p2.png", "image/png", vec![1]).unwrap()])
            .unwrap();
        assert!(!report.extraction_committed);
        assert!(report.readings.is_empty());
    }
}
