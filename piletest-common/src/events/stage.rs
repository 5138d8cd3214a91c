//! Workflow stage shared between the engine and event consumers

use serde::{Deserialize, Serialize};

/// Report workflow stage
///
/// Stages advance `Intake → Verify → Finalize`; backward navigation is free.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Sources uploaded, test type selected, extraction pending
    #[default]
    Intake,
    /// Extracted fields under human review
    Verify,
    /// Report locked for rendering/export
    Finalize,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Intake => "intake",
            Stage::Verify => "verify",
            Stage::Finalize => "finalize",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
