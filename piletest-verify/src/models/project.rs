//! Project record: the header block of a field sheet
//!
//! Every header field is kept as text, exactly as the sheet states it
//! ("706 cm²", "M-30"). Numeric consumers go through [`leading_number`].

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::TestType;
use crate::types::ConfidenceValue;

/// Header fields of one pile load test
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub test_no: ConfidenceValue<String>,
    pub project: ConfidenceValue<String>,
    pub location: ConfidenceValue<String>,
    pub contractor: ConfidenceValue<String>,
    pub client_name: ConfidenceValue<String>,
    /// Pile diameter (mm)
    pub pile_diameter: ConfidenceValue<String>,
    /// Pile depth (m)
    pub pile_depth: ConfidenceValue<String>,
    /// Concrete mix design, e.g. "M-30"
    pub mixed_design: ConfidenceValue<String>,
    /// Design (safe working) load (MT)
    pub design_load: ConfidenceValue<String>,
    /// Target test load (MT)
    pub test_load: ConfidenceValue<String>,
    /// Jack ram area (cm²)
    pub ram_area: ConfidenceValue<String>,
    pub date_of_casting: ConfidenceValue<String>,
    /// Least count of the dial gauges (datum)
    pub lc_dial_gauge: ConfidenceValue<String>,
    /// Test type as written on the sheet
    pub test_type: ConfidenceValue<String>,
}

/// Editable header field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectField {
    TestNo,
    Project,
    Location,
    Contractor,
    ClientName,
    PileDiameter,
    PileDepth,
    MixedDesign,
    DesignLoad,
    TestLoad,
    RamArea,
    DateOfCasting,
    LcDialGauge,
    TestType,
}

impl ProjectField {
    pub const ALL: [ProjectField; 14] = [
        ProjectField::TestNo,
        ProjectField::Project,
        ProjectField::Location,
        ProjectField::Contractor,
        ProjectField::ClientName,
        ProjectField::PileDiameter,
        ProjectField::PileDepth,
        ProjectField::MixedDesign,
        ProjectField::DesignLoad,
        ProjectField::TestLoad,
        ProjectField::RamArea,
        ProjectField::DateOfCasting,
        ProjectField::LcDialGauge,
        ProjectField::TestType,
    ];

    /// Wire/JSON key of the field
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectField::TestNo => "test_no",
            ProjectField::Project => "project",
            ProjectField::Location => "location",
            ProjectField::Contractor => "contractor",
            ProjectField::ClientName => "client_name",
            ProjectField::PileDiameter => "pile_diameter",
            ProjectField::PileDepth => "pile_depth",
            ProjectField::MixedDesign => "mixed_design",
            ProjectField::DesignLoad => "design_load",
            ProjectField::TestLoad => "test_load",
            ProjectField::RamArea => "ram_area",
            ProjectField::DateOfCasting => "date_of_casting",
            ProjectField::LcDialGauge => "lc_dial_gauge",
            ProjectField::TestType => "test_type",
        }
    }
}

impl FromStr for ProjectField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProjectField::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown project field: {}", s))
    }
}

impl ProjectRecord {
    pub fn field(&self, field: ProjectField) -> &ConfidenceValue<String> {
        match field {
            ProjectField::TestNo => &self.test_no,
            ProjectField::Project => &self.project,
            ProjectField::Location => &self.location,
            ProjectField::Contractor => &self.contractor,
            ProjectField::ClientName => &self.client_name,
            ProjectField::PileDiameter => &self.pile_diameter,
            ProjectField::PileDepth => &self.pile_depth,
            ProjectField::MixedDesign => &self.mixed_design,
            ProjectField::DesignLoad => &self.design_load,
            ProjectField::TestLoad => &self.test_load,
            ProjectField::RamArea => &self.ram_area,
            ProjectField::DateOfCasting => &self.date_of_casting,
            ProjectField::LcDialGauge => &self.lc_dial_gauge,
            ProjectField::TestType => &self.test_type,
        }
    }

    pub fn field_mut(&mut self, field: ProjectField) -> &mut ConfidenceValue<String> {
        match field {
            ProjectField::TestNo => &mut self.test_no,
            ProjectField::Project => &mut self.project,
            ProjectField::Location => &mut self.location,
            ProjectField::Contractor => &mut self.contractor,
            ProjectField::ClientName => &mut self.client_name,
            ProjectField::PileDiameter => &mut self.pile_diameter,
            ProjectField::PileDepth => &mut self.pile_depth,
            ProjectField::MixedDesign => &mut self.mixed_design,
            ProjectField::DesignLoad => &mut self.design_load,
            ProjectField::TestLoad => &mut self.test_load,
            ProjectField::RamArea => &mut self.ram_area,
            ProjectField::DateOfCasting => &mut self.date_of_casting,
            ProjectField::LcDialGauge => &mut self.lc_dial_gauge,
            ProjectField::TestType => &mut self.test_type,
        }
    }

    /// Numeric reading of a header field ("706 cm²" → 706.0)
    pub fn numeric(&self, field: ProjectField) -> Option<f64> {
        self.field(field).value.as_deref().and_then(leading_number)
    }

    /// True when no header field carries a value
    pub fn is_blank(&self) -> bool {
        ProjectField::ALL
            .iter()
            .all(|f| !self.field(*f).is_present())
    }

    /// Test type written on the sheet, if recognizable
    pub fn detected_test_type(&self) -> Option<TestType> {
        self.test_type.value.as_deref().and_then(TestType::from_sheet_text)
    }
}

/// First decimal number in `text`
///
/// Thousands separators between digits are skipped ("2,551" → 2551.0).
pub fn leading_number(text: &str) -> Option<f64> {
    let chars: Vec<char> = text.chars().collect();
    let start = chars.iter().enumerate().position(|(i, c)| {
        c.is_ascii_digit()
            || (*c == '.' && chars.get(i + 1).map(|n| n.is_ascii_digit()).unwrap_or(false))
    })?;

    let mut number = String::new();
    let mut seen_dot = false;
    let mut i = start;
    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_digit() {
            number.push(c);
        } else if c == '.' && !seen_dot {
            seen_dot = true;
            number.push(c);
        } else if c == ','
            && !seen_dot
            && chars.get(i + 1).map(|n| n.is_ascii_digit()).unwrap_or(false)
        {
            // thousands separator
        } else {
            break;
        }
        i += 1;
    }

    number.trim_end_matches('.').parse::<f64>().ok()
}
