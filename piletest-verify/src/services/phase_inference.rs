//! Phase inference over the ordered reading series
//!
//! Single left-to-right pass comparing each pressure with the last known
//! pressure:
//! - higher → loading, lower → unloading, equal → holding
//! - a missing pressure carries the current phase forward
//! - a "hold" remark forces holding on the following reading when its
//!   pressure is unchanged
//! - the first reading with a pressure starts in holding when its own remark
//!   says "hold"
//!
//! The series starts in loading. This is a heuristic; the reviewer can switch
//! inference off, which leaves phases absent.

use crate::models::{Phase, ReadingRecord};

/// Phase for each reading, in input order
pub fn infer_phase_sequence(readings: &[ReadingRecord]) -> Vec<Phase> {
    let mut phases = Vec::with_capacity(readings.len());
    let mut previous_pressure: Option<f64> = None;
    let mut current = Phase::Loading;

    for (i, reading) in readings.iter().enumerate() {
        let Some(pressure) = reading.pressure.value else {
            phases.push(current);
            continue;
        };

        match previous_pressure {
            Some(previous) => {
                current = if pressure > previous {
                    Phase::Loading
                } else if pressure < previous {
                    Phase::Unloading
                } else {
                    Phase::Holding
                };
            }
            None if reading.remark_mentions_hold() => current = Phase::Holding,
            None => {}
        }

        let held_from_preceding = i > 0 && {
            let preceding = &readings[i - 1];
            preceding.pressure.value == Some(pressure) && preceding.remark_mentions_hold()
        };
        if held_from_preceding {
            current = Phase::Holding;
        }

        previous_pressure = Some(pressure);
        phases.push(current);
    }

    phases
}

/// Return a copy of `readings` with every phase recomputed
pub fn infer_phases(readings: &[ReadingRecord]) -> Vec<ReadingRecord> {
    let phases = infer_phase_sequence(readings);
    readings
        .iter()
        .zip(phases)
        .map(|(reading, phase)| ReadingRecord {
            phase: Some(phase),
            ..reading.clone()
        })
        .collect()
}

/// Drop all inferred phases
pub fn clear_phases(readings: &mut [ReadingRecord]) {
    for reading in readings {
        reading.phase = None;
    }
}
