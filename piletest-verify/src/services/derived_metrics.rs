//! Derived engineering results
//!
//! Pure functions of the project header and the reading series; nothing here
//! is stored or edited independently. Missing inputs yield `None`, never zero.

use serde::{Deserialize, Serialize};

use crate::models::{Phase, ProjectField, ProjectRecord, ReadingRecord, TestType, GAUGE_COUNT};

/// Codified net settlement limit for vertical tests (mm)
pub const SETTLEMENT_LIMIT_MM: f64 = 12.0;

/// Acceptance status of the test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PassFail {
    Pass,
    Fail,
    /// Result cannot be computed from the available data
    Undetermined,
}

/// Applied load in MT from pressure (kg/cm²) and ram area (cm²)
pub fn load(pressure: Option<f64>, ram_area: Option<f64>) -> Option<f64> {
    Some(pressure? * ram_area? / 1000.0)
}

/// Mean of the gauges that were read; `None` when none were
pub fn average_settlement(gauges: &[Option<f64>; GAUGE_COUNT]) -> Option<f64> {
    let present: Vec<f64> = gauges.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

/// Average settlement of the first reading with any gauge value
pub fn initial_settlement(readings: &[ReadingRecord]) -> Option<f64> {
    readings
        .iter()
        .find_map(|r| average_settlement(&r.gauge_values()))
}

/// Average settlement once the load has been fully removed
///
/// Taken from the last unloading reading whose pressure equals the lowest
/// pressure recorded in the series.
pub fn final_settlement_after_full_unload(readings: &[ReadingRecord]) -> Option<f64> {
    let min_pressure = readings
        .iter()
        .filter_map(|r| r.pressure.value)
        .fold(None, |min: Option<f64>, p| Some(min.map_or(p, |m| m.min(p))))?;

    readings
        .iter()
        .rev()
        .find(|r| r.phase == Some(Phase::Unloading) && r.pressure.value == Some(min_pressure))
        .and_then(|r| average_settlement(&r.gauge_values()))
}

/// Permanent settlement: final after full unload minus initial
pub fn net_settlement(final_settlement: Option<f64>, initial: Option<f64>) -> Option<f64> {
    Some(final_settlement? - initial?)
}

/// Acceptance status for a net settlement
///
/// Vertical tests pass at or below [`SETTLEMENT_LIMIT_MM`]. Pullout and
/// lateral tests have no codified limit here and stay undetermined.
pub fn pass_fail(net_settlement: Option<f64>, test_type: TestType) -> PassFail {
    match (net_settlement, test_type.is_vertical()) {
        (Some(net), true) if net <= SETTLEMENT_LIMIT_MM => PassFail::Pass,
        (Some(_), true) => PassFail::Fail,
        _ => PassFail::Undetermined,
    }
}

/// Per-reading derived values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingMetrics {
    pub load_mt: Option<f64>,
    pub average_settlement_mm: Option<f64>,
    pub phase: Option<Phase>,
}

/// All derived results for one report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedResults {
    pub readings: Vec<ReadingMetrics>,
    pub initial_settlement_mm: Option<f64>,
    pub final_settlement_mm: Option<f64>,
    pub net_settlement_mm: Option<f64>,
    pub max_settlement_mm: Option<f64>,
    pub max_applied_load_mt: Option<f64>,
    /// Declared test load from the header
    pub test_load_mt: Option<f64>,
    /// Declared design (safe) load from the header
    pub safe_load_mt: Option<f64>,
    pub status: PassFail,
}

fn max_of(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values
        .flatten()
        .fold(None, |max: Option<f64>, v| Some(max.map_or(v, |m| m.max(v))))
}

/// Compute every derived result
pub fn compute(
    project: &ProjectRecord,
    readings: &[ReadingRecord],
    test_type: Option<TestType>,
) -> DerivedResults {
    let ram_area = project.numeric(ProjectField::RamArea);

    let per_reading: Vec<ReadingMetrics> = readings
        .iter()
        .map(|r| ReadingMetrics {
            load_mt: load(r.pressure.value, ram_area),
            average_settlement_mm: average_settlement(&r.gauge_values()),
            phase: r.phase,
        })
        .collect();

    let initial = initial_settlement(readings);
    let final_settlement = final_settlement_after_full_unload(readings);
    let net = net_settlement(final_settlement, initial);
    let status = test_type
        .map(|t| pass_fail(net, t))
        .unwrap_or(PassFail::Undetermined);

    DerivedResults {
        max_settlement_mm: max_of(per_reading.iter().map(|m| m.average_settlement_mm)),
        max_applied_load_mt: max_of(per_reading.iter().map(|m| m.load_mt)),
        readings: per_reading,
        initial_settlement_mm: initial,
        final_settlement_mm: final_settlement,
        net_settlement_mm: net,
        test_load_mt: project.numeric(ProjectField::TestLoad),
        safe_load_mt: project.numeric(ProjectField::DesignLoad),
        status,
    }
}
