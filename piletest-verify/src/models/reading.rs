//! Reading record: one time-stamped row of the field sheet
//!
//! Pressure in kg/cm², dial gauges in mm. Exactly four gauge slots per
//! record, matching the fixed instrumentation.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::types::{ConfidenceValue, FieldKind, FieldSlot};

/// Number of dial gauges read per observation
pub const GAUGE_COUNT: usize = 4;

/// Inferred test-cycle state of a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Loading,
    Unloading,
    Holding,
}

/// One measurement row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingRecord {
    pub date: ConfidenceValue<String>,
    pub time: ConfidenceValue<String>,
    /// Pressure gauge reading (kg/cm²)
    pub pressure: ConfidenceValue<f64>,
    /// Dial gauge readings 1-4 (mm)
    pub gauges: [ConfidenceValue<f64>; GAUGE_COUNT],
    pub remark: ConfidenceValue<String>,
    /// Absent until phase inference runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
}

/// Editable field of a reading record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingField {
    Date,
    Time,
    Pressure,
    Gauge1,
    Gauge2,
    Gauge3,
    Gauge4,
    Remark,
}

impl ReadingField {
    pub const ALL: [ReadingField; 8] = [
        ReadingField::Date,
        ReadingField::Time,
        ReadingField::Pressure,
        ReadingField::Gauge1,
        ReadingField::Gauge2,
        ReadingField::Gauge3,
        ReadingField::Gauge4,
        ReadingField::Remark,
    ];

    /// Wire/JSON key of the field
    pub fn as_str(self) -> &'static str {
        match self {
            ReadingField::Date => "date",
            ReadingField::Time => "time",
            ReadingField::Pressure => "pressure",
            ReadingField::Gauge1 => "gauge1",
            ReadingField::Gauge2 => "gauge2",
            ReadingField::Gauge3 => "gauge3",
            ReadingField::Gauge4 => "gauge4",
            ReadingField::Remark => "remark",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            ReadingField::Date | ReadingField::Time | ReadingField::Remark => FieldKind::Text,
            _ => FieldKind::Numeric,
        }
    }

    /// Whether a change to this field invalidates the cached phase
    pub fn drives_phase(self) -> bool {
        matches!(self, ReadingField::Pressure | ReadingField::Remark)
    }
}

impl FromStr for ReadingField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReadingField::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown reading field: {}", s))
    }
}

impl ReadingRecord {
    /// Borrow a field for merging
    pub fn slot_mut(&mut self, field: ReadingField) -> FieldSlot<'_> {
        match field {
            ReadingField::Date => FieldSlot::Text(&mut self.date),
            ReadingField::Time => FieldSlot::Text(&mut self.time),
            ReadingField::Remark => FieldSlot::Text(&mut self.remark),
            ReadingField::Pressure => FieldSlot::Numeric(&mut self.pressure),
            ReadingField::Gauge1 => FieldSlot::Numeric(&mut self.gauges[0]),
            ReadingField::Gauge2 => FieldSlot::Numeric(&mut self.gauges[1]),
            ReadingField::Gauge3 => FieldSlot::Numeric(&mut self.gauges[2]),
            ReadingField::Gauge4 => FieldSlot::Numeric(&mut self.gauges[3]),
        }
    }

    /// Confidence score of a field
    pub fn confidence_of(&self, field: ReadingField) -> f64 {
        match field {
            ReadingField::Date => self.date.confidence,
            ReadingField::Time => self.time.confidence,
            ReadingField::Pressure => self.pressure.confidence,
            ReadingField::Remark => self.remark.confidence,
            ReadingField::Gauge1 => self.gauges[0].confidence,
            ReadingField::Gauge2 => self.gauges[1].confidence,
            ReadingField::Gauge3 => self.gauges[2].confidence,
            ReadingField::Gauge4 => self.gauges[3].confidence,
        }
    }

    pub fn gauge_values(&self) -> [Option<f64>; GAUGE_COUNT] {
        [
            self.gauges[0].value,
            self.gauges[1].value,
            self.gauges[2].value,
            self.gauges[3].value,
        ]
    }

    /// Mean confidence over the four gauge slots
    pub fn mean_gauge_confidence(&self) -> f64 {
        self.gauges.iter().map(|g| g.confidence).sum::<f64>() / GAUGE_COUNT as f64
    }

    /// Whether the remark marks a hold period (case-insensitive "hold")
    pub fn remark_mentions_hold(&self) -> bool {
        self.remark
            .value
            .as_deref()
            .map(|r| r.to_ascii_lowercase().contains("hold"))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_parse_and_kind() {
        assert_eq!("Gauge3".parse::<ReadingField>().unwrap(), ReadingField::Gauge3);
        assert_eq!(" pressure ".parse::<ReadingField>().unwrap(), ReadingField::Pressure);
        assert!("load".parse::<ReadingField>().is_err());

        assert_eq!(ReadingField::Pressure.kind(), FieldKind::Numeric);
        assert_eq!(ReadingField::Gauge4.kind(), FieldKind::Numeric);
        assert_eq!(ReadingField::Remark.kind(), FieldKind::Text);
    }

    #[test]
    fn test_slot_mut_addresses_each_gauge() {
        let mut record = ReadingRecord::default();
        for (i, field) in [
            ReadingField::Gauge1,
            ReadingField::Gauge2,
            ReadingField::Gauge3,
            ReadingField::Gauge4,
        ]
        .into_iter()
        .enumerate()
        {
            match record.slot_mut(field) {
                FieldSlot::Numeric(cv) => cv.value = Some(i as f64),
                FieldSlot::Text(_) => panic!("gauge slot must be numeric"),
            }
        }
        assert_eq!(record.gauge_values(), [Some(0.0), Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_hold_detection_is_case_insensitive() {
        let mut record = ReadingRecord::default();
        assert!(!record.remark_mentions_hold());

        record.remark.value = Some("HOLD 30 min".to_string());
        assert!(record.remark_mentions_hold());

        record.remark.value = Some("Holding".to_string());
        assert!(record.remark_mentions_hold());

        record.remark.value = Some("release".to_string());
        assert!(!record.remark_mentions_hold());
    }

    #[test]
    fn test_phase_absent_is_not_serialized() {
        let json = serde_json::to_value(ReadingRecord::default()).unwrap();
        assert!(json.get("phase").is_none());
        assert_eq!(json["gauges"].as_array().unwrap().len(), GAUGE_COUNT);
    }
}
