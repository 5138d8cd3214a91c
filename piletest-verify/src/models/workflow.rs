//! Report workflow state machine
//!
//! INTAKE → VERIFY → FINALIZE, gate-forward and open-backward:
//! - Intake → Verify needs uploaded sources, a selected test type and a
//!   committed extraction
//! - Verify → Finalize needs at least one reading
//! - Finalize → Verify is always allowed
//! - Any stage → Intake is an unconditional reset
//!
//! Every other move is illegal and leaves the report untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
pub use piletest_common::events::Stage;

/// State transition record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTransition {
    pub old_stage: Stage,
    pub new_stage: Stage,
    pub transitioned_at: DateTime<Utc>,
}

impl StageTransition {
    pub fn new(old_stage: Stage, new_stage: Stage) -> Self {
        Self {
            old_stage,
            new_stage,
            transitioned_at: Utc::now(),
        }
    }
}

/// Facts about the report that the transition guards inspect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuardContext {
    pub source_count: usize,
    pub test_type_selected: bool,
    pub extraction_committed: bool,
    pub reading_count: usize,
}

/// Check whether `from → to` is legal for the given report facts
pub fn check_transition(from: Stage, to: Stage, ctx: &GuardContext) -> Result<(), EngineError> {
    let illegal = |reason: &str| EngineError::IllegalTransition {
        from,
        to,
        reason: reason.to_string(),
    };

    match (from, to) {
        (_, Stage::Intake) => Ok(()),

        (Stage::Intake, Stage::Verify) => {
            if ctx.source_count == 0 {
                Err(illegal("upload at least one field sheet first"))
            } else if !ctx.test_type_selected {
                Err(illegal("select a test type first"))
            } else if !ctx.extraction_committed {
                Err(illegal("extraction has not completed successfully"))
            } else {
                Ok(())
            }
        }

        (Stage::Verify, Stage::Finalize) => {
            if ctx.reading_count == 0 {
                Err(illegal("at least one reading is required"))
            } else {
                Ok(())
            }
        }

        (Stage::Finalize, Stage::Verify) => Ok(()),

        (Stage::Intake, Stage::Finalize) => Err(illegal("the verify stage cannot be skipped")),

        (Stage::Verify, Stage::Verify) | (Stage::Finalize, Stage::Finalize) => {
            Err(illegal("already in this stage"))
        }
    }
}
