//! Field confidence classifier
//!
//! Maps an extraction confidence onto a review tier. The tier drives UI
//! highlighting and the "needs verification" count.

use serde::{Deserialize, Serialize};

use crate::models::{ProjectField, ProjectRecord, ReadingField, ReadingRecord};
use crate::types::VERIFIED_CONFIDENCE;

/// Below this a field is `Low`
pub const MEDIUM_THRESHOLD: f64 = 0.75;

/// At or above this a field is `High`
pub const HIGH_THRESHOLD: f64 = 0.85;

/// Review tier of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

/// Classify a confidence score (expected finite, 0.0-1.0)
pub fn classify(confidence: f64) -> ConfidenceTier {
    if confidence < MEDIUM_THRESHOLD {
        ConfidenceTier::Low
    } else if confidence < HIGH_THRESHOLD {
        ConfidenceTier::Medium
    } else {
        ConfidenceTier::High
    }
}

/// Per-tier field counts across a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    /// Fields the reviewer still has to look at (low tier)
    pub needs_verification: usize,
    /// Fields set by a human edit
    pub verified: usize,
}

impl ReviewSummary {
    pub fn for_records(project: &ProjectRecord, readings: &[ReadingRecord]) -> Self {
        let project_scores = ProjectField::ALL
            .iter()
            .map(|f| project.field(*f).confidence);
        let reading_scores = readings.iter().flat_map(|r| {
            ReadingField::ALL
                .iter()
                .map(move |f| r.confidence_of(*f))
        });

        let mut summary = ReviewSummary::default();
        for score in project_scores.chain(reading_scores) {
            if score >= VERIFIED_CONFIDENCE {
                summary.verified += 1;
            }
            match classify(score) {
                ConfidenceTier::Low => summary.low += 1,
                ConfidenceTier::Medium => summary.medium += 1,
                ConfidenceTier::High => summary.high += 1,
            }
        }
        summary.needs_verification = summary.low;
        summary
    }
}
