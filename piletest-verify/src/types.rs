//! Core types and the extraction collaborator trait
//!
//! - `ConfidenceValue<T>`: a field value paired with an extraction-confidence score
//! - `FieldKind` / `FieldSlot`: closed tagged union of editable field kinds
//! - `Extractor`: boundary to the OCR service (black box returning scored fields)

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ProjectRecord, ReadingRecord, SourceFile};

/// Confidence assigned to a value a human has explicitly set
pub const VERIFIED_CONFIDENCE: f64 = 1.0;

/// Highest score a collaborator-reported value can carry
pub const MAX_EXTRACTED_CONFIDENCE: f64 = 0.999;

// ============================================================================
// Confidence Value
// ============================================================================

/// Confidence-scored field value
///
/// `value == None` means "not extracted / not provided"; the score is kept
/// either way. A score of exactly 1.0 is reserved for human edits and only
/// `verified` produces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceValue<T> {
    /// Field value, `None` when absent
    pub value: Option<T>,
    /// Extraction confidence (0.0-1.0)
    pub confidence: f64,
}

impl<T> ConfidenceValue<T> {
    /// Collaborator-scored value, clamped into 0.0-`MAX_EXTRACTED_CONFIDENCE`
    /// (NaN becomes 0.0)
    pub fn new(value: Option<T>, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, MAX_EXTRACTED_CONFIDENCE)
        };
        Self { value, confidence }
    }

    /// Absent value with zero confidence
    pub fn empty() -> Self {
        Self {
            value: None,
            confidence: 0.0,
        }
    }

    /// Value set by a human edit
    pub fn verified(value: Option<T>) -> Self {
        Self {
            value,
            confidence: VERIFIED_CONFIDENCE,
        }
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }
}

impl<T> Default for ConfidenceValue<T> {
    fn default() -> Self {
        Self::empty()
    }
}

// ============================================================================
// Field kinds
// ============================================================================

/// Kind of an editable field; decides how raw input is merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Parsed as a finite number
    Numeric,
    /// Trimmed free text
    Text,
}

/// Mutable borrow of one field, tagged with its kind
#[derive(Debug)]
pub enum FieldSlot<'a> {
    Numeric(&'a mut ConfidenceValue<f64>),
    Text(&'a mut ConfidenceValue<String>),
}

// ============================================================================
// Extraction collaborator
// ============================================================================

/// One extraction result: a project header plus readings in sheet order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionBatch {
    pub project: ProjectRecord,
    pub readings: Vec<ReadingRecord>,
    /// Number of pages the collaborator processed
    pub page_count: usize,
}

/// Extraction collaborator error
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Service could not be reached at all
    #[error("OCR service unreachable: {0}")]
    Unreachable(String),

    /// Service answered with an error status
    #[error("OCR service error {0}: {1}")]
    Api(u16, String),

    /// Transport failure after the connection was made (timeout, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// Response body did not match the expected batch shape
    #[error("Malformed extraction batch: {0}")]
    Malformed(String),
}

/// Extraction collaborator
///
/// Implementations must preserve chronological sheet order in the returned
/// readings. `is_available` is a cheap reachability check used to gate
/// whether an extraction is attempted at all.
#[async_trait::async_trait]
pub trait Extractor: Send + Sync {
    /// Collaborator name for logging
    fn name(&self) -> &'static str;

    /// Whether the collaborator is reachable and ready
    async fn is_available(&self) -> bool;

    /// Extract a batch from the uploaded sources
    async fn extract(&self, sources: &[SourceFile]) -> Result<ExtractionBatch, ExtractionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(
            ConfidenceValue::new(Some(1.0), 1.7).confidence,
            MAX_EXTRACTED_CONFIDENCE
        );
        assert_eq!(ConfidenceValue::new(Some(1.0), -0.2).confidence, 0.0);
        assert_eq!(ConfidenceValue::<f64>::new(None, f64::NAN).confidence, 0.0);
    }

    #[test]
    fn test_null_value_keeps_its_score() {
        let cv: ConfidenceValue<String> = ConfidenceValue::new(None, 0.42);
        assert!(!cv.is_present());
        assert_eq!(cv.confidence, 0.42);
    }

    #[test]
    fn test_collaborator_score_never_reaches_verified() {
        let cv = ConfidenceValue::new(Some("hold".to_string()), 1.0);
        assert!(cv.confidence < VERIFIED_CONFIDENCE);
        assert_eq!(cv.confidence, MAX_EXTRACTED_CONFIDENCE);
    }

    #[test]
    fn test_verified_value() {
        let cv = ConfidenceValue::verified(Some("hold".to_string()));
        assert_eq!(cv.confidence, VERIFIED_CONFIDENCE);
    }
}
