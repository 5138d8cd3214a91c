//! Event types for the report event system
//!
//! Provides the shared event enum and the broadcast EventBus used to fan out
//! report mutations to SSE clients and other observers.

mod stage;

pub use stage::Stage;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Report event types
///
/// Serialized with a `type` tag for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReportEvent {
    /// Workflow stage changed
    StageChanged {
        old_stage: Stage,
        new_stage: Stage,
        timestamp: DateTime<Utc>,
    },

    /// A human edit was merged into a field
    FieldEdited {
        /// `None` for project header fields
        reading_index: Option<usize>,
        field: String,
        /// False when the edit left the value unchanged
        changed: bool,
        timestamp: DateTime<Utc>,
    },

    /// Phase inference ran (or was switched off when `enabled` is false)
    PhasesInferred {
        enabled: bool,
        reading_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Extraction request issued to the OCR collaborator
    ExtractionStarted {
        ticket: u64,
        source_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Extraction result committed into the report
    ExtractionCommitted {
        ticket: u64,
        reading_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Extraction result arrived after being superseded and was dropped
    ExtractionDiscarded {
        ticket: u64,
        timestamp: DateTime<Utc>,
    },

    /// Extraction failed; report data left unchanged
    ExtractionFailed {
        ticket: u64,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Report discarded and workflow returned to intake
    ReportReset {
        timestamp: DateTime<Utc>,
    },
}

impl ReportEvent {
    /// Event type name, used as the SSE `event:` field
    pub fn event_type(&self) -> &str {
        match self {
            ReportEvent::StageChanged { .. } => "StageChanged",
            ReportEvent::FieldEdited { .. } => "FieldEdited",
            ReportEvent::PhasesInferred { .. } => "PhasesInferred",
            ReportEvent::ExtractionStarted { .. } => "ExtractionStarted",
            ReportEvent::ExtractionCommitted { .. } => "ExtractionCommitted",
            ReportEvent::ExtractionDiscarded { .. } => "ExtractionDiscarded",
            ReportEvent::ExtractionFailed { .. } => "ExtractionFailed",
            ReportEvent::ReportReset { .. } => "ReportReset",
        }
    }
}

/// Broadcast bus for report events
///
/// Cloning shares the underlying channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ReportEvent>,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ReportEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ReportEvent) {
        let _ = self.tx.send(event);
    }
}
