//! Data models for piletest-verify

pub mod project;
pub mod reading;
pub mod report;
pub mod source;
pub mod workflow;

pub use project::{leading_number, ProjectField, ProjectRecord};
pub use reading::{Phase, ReadingField, ReadingRecord, GAUGE_COUNT};
pub use report::{Report, TestType};
pub use source::SourceFile;
pub use workflow::{check_transition, GuardContext, Stage, StageTransition};
