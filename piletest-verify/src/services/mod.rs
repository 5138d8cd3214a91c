//! Service modules for the reconciliation engine
//!
//! Pure engines (classifier, merger, inference, metrics, checks) plus the
//! OCR client and the report store that ties them together.

pub mod batch_merger;
pub mod derived_metrics;
pub mod edit_merger;
pub mod field_classifier;
pub mod ocr_client;
pub mod phase_inference;
pub mod report_store;
pub mod sheet_checks;

pub use batch_merger::merge_pages;
pub use derived_metrics::{DerivedResults, PassFail, ReadingMetrics, SETTLEMENT_LIMIT_MM};
pub use edit_merger::{apply_project_edit, apply_reading_edit, EditOutcome};
pub use field_classifier::{classify, ConfidenceTier, ReviewSummary};
pub use ocr_client::{parse_extract_response, OcrClient};
pub use phase_inference::{clear_phases, infer_phases};
pub use report_store::{ExtractionOutcome, ReportSnapshot, ReportStore, ReportView};
pub use sheet_checks::SheetWarning;
