//! Field sheet consistency checks
//!
//! Advisory only: warnings are shown to the reviewer and never block a
//! stage change.

use serde::Serialize;

use crate::models::ReadingRecord;

/// Fraction of the declared test load the series may fall short by
pub const LOAD_TOLERANCE: f64 = 0.05;

/// Declared loads at or below this are treated as placeholders
pub const MIN_DECLARED_LOAD_MT: f64 = 1.0;

/// Reviewer-facing consistency warning
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SheetWarning {
    /// Clock time is earlier than the previous reading on the same date
    TimeWentBackwards {
        reading_index: usize,
        previous_time: String,
        time: String,
    },
    /// Highest applied load never reached the declared test load
    LoadTargetNotReached {
        max_applied_load_mt: f64,
        test_load_mt: f64,
    },
}

impl SheetWarning {
    pub fn message(&self) -> String {
        match self {
            SheetWarning::TimeWentBackwards {
                reading_index,
                previous_time,
                time,
            } => format!(
                "Reading {} at {} is earlier than the previous reading at {}",
                reading_index + 1,
                time,
                previous_time
            ),
            SheetWarning::LoadTargetNotReached {
                max_applied_load_mt,
                test_load_mt,
            } => format!(
                "Maximum applied load {:.1} MT is below the declared test load {:.1} MT",
                max_applied_load_mt, test_load_mt
            ),
        }
    }
}

/// Minutes since midnight for "HH:MM", "HH.MM" or "HH-MM"
pub fn parse_clock_minutes(text: &str) -> Option<u32> {
    let (hours, minutes) = text.trim().split_once([':', '.', '-'])?;
    let hours: u32 = hours.trim().parse().ok()?;
    let minutes: u32 = minutes.trim().parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Readings whose time goes backwards within the same date
///
/// A blank date continues the last written one, as on the sheets where the
/// date is only filled in on the first row of each day.
pub fn chronology_warnings(readings: &[ReadingRecord]) -> Vec<SheetWarning> {
    let mut warnings = Vec::new();
    let mut current_date: Option<&str> = None;
    let mut previous: Option<(Option<&str>, u32, &str)> = None;

    for (index, reading) in readings.iter().enumerate() {
        if let Some(date) = reading.date.value.as_deref() {
            current_date = Some(date);
        }
        let Some(time) = reading.time.value.as_deref() else {
            continue;
        };
        let Some(minutes) = parse_clock_minutes(time) else {
            continue;
        };

        if let Some((previous_date, previous_minutes, previous_time)) = previous {
            if previous_date == current_date && minutes < previous_minutes {
                warnings.push(SheetWarning::TimeWentBackwards {
                    reading_index: index,
                    previous_time: previous_time.to_string(),
                    time: time.to_string(),
                });
            }
        }
        previous = Some((current_date, minutes, time));
    }

    warnings
}

/// Warn when the maximum applied load falls short of the declared test load
pub fn load_target_warning(
    max_applied_load_mt: Option<f64>,
    test_load_mt: Option<f64>,
) -> Option<SheetWarning> {
    let (max_load, target) = (max_applied_load_mt?, test_load_mt?);
    if target <= MIN_DECLARED_LOAD_MT {
        return None;
    }
    (max_load < target * (1.0 - LOAD_TOLERANCE)).then_some(SheetWarning::LoadTargetNotReached {
        max_applied_load_mt: max_load,
        test_load_mt: target,
    })
}
