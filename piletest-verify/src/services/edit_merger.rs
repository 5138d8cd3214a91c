//! Edit merger: applies human corrections to confidence-scored fields
//!
//! Merge rules:
//! - Numeric fields parse the trimmed input; unparseable input stores `None`
//! - Text fields are trimmed; an empty string stores `None`
//! - Confidence becomes 1.0 regardless of the parse outcome
//! - An edit that leaves the value unchanged is reported as a no-op
//!
//! A changed pressure or remark clears the record's cached phase.

use serde::Serialize;

use crate::models::{ProjectField, ProjectRecord, ReadingField, ReadingRecord};
use crate::types::{ConfidenceValue, FieldKind, FieldSlot};

/// Result of merging one edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EditOutcome {
    /// How the raw input was interpreted
    pub kind: FieldKind,
    /// Stored value differs from the previous one
    pub changed: bool,
    /// Non-empty input could not be coerced to the field type and was stored as empty
    pub coerced_to_empty: bool,
    /// The record's phase was cleared and needs re-inference
    pub invalidates_phase: bool,
}

/// Parse numeric input; `None` for empty, unparseable or non-finite input
pub fn parse_numeric(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Normalize text input; `None` when blank
pub fn normalize_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn merge_numeric(cv: &mut ConfidenceValue<f64>, raw: &str) -> (bool, bool) {
    let parsed = parse_numeric(raw);
    let coerced = parsed.is_none() && !raw.trim().is_empty();
    let changed = cv.value != parsed;
    *cv = ConfidenceValue::verified(parsed);
    (changed, coerced)
}

fn merge_text(cv: &mut ConfidenceValue<String>, raw: &str) -> bool {
    let normalized = normalize_text(raw);
    let changed = cv.value != normalized;
    *cv = ConfidenceValue::verified(normalized);
    changed
}

/// Merge an edit into a reading field
pub fn apply_reading_edit(record: &mut ReadingRecord, field: ReadingField, raw: &str) -> EditOutcome {
    let (changed, coerced_to_empty) = match record.slot_mut(field) {
        FieldSlot::Numeric(cv) => merge_numeric(cv, raw),
        FieldSlot::Text(cv) => (merge_text(cv, raw), false),
    };

    let invalidates_phase = changed && field.drives_phase();
    if invalidates_phase {
        record.phase = None;
    }

    if coerced_to_empty {
        tracing::debug!(field = field.as_str(), input = raw, "Unparseable edit stored as empty");
    }

    EditOutcome {
        kind: field.kind(),
        changed,
        coerced_to_empty,
        invalidates_phase,
    }
}

/// Merge an edit into a project header field (all header fields are text)
pub fn apply_project_edit(project: &mut ProjectRecord, field: ProjectField, raw: &str) -> EditOutcome {
    let changed = merge_text(project.field_mut(field), raw);
    EditOutcome {
        kind: FieldKind::Text,
        changed,
        coerced_to_empty: false,
        invalidates_phase: false,
    }
}
