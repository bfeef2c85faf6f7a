//! Per-disc grading output

use super::region::DiscId;
use serde::{Deserialize, Serialize};

pub const PFIRRMANN_RANGE: std::ops::RangeInclusive<u8> = 1..=5;
pub const NARROWING_RANGE: std::ops::RangeInclusive<u8> = 0..=3;
pub const STENOSIS_RANGE: std::ops::RangeInclusive<u8> = 0..=3;

/// Radiological grading of one intervertebral disc
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    pub disc: DiscId,
    /// Pfirrmann degeneration score, 1 (healthy) to 5
    pub pfirrmann: u8,
    /// Disc height loss, 0 (none) to 3
    pub narrowing: u8,
    pub central_canal_stenosis: u8,
    pub spondylolisthesis: bool,
    pub upper_marrow: bool,
    pub lower_marrow: bool,
    pub upper_endplate_defect: bool,
    pub lower_endplate_defect: bool,
    pub foraminal_stenosis_left: bool,
    pub foraminal_stenosis_right: bool,
    pub herniation: bool,
}

impl Grade {
    /// A disc with no findings
    pub fn healthy(disc: DiscId) -> Self {
        Self {
            disc,
            pfirrmann: 1,
            narrowing: 0,
            central_canal_stenosis: 0,
            spondylolisthesis: false,
            upper_marrow: false,
            lower_marrow: false,
            upper_endplate_defect: false,
            lower_endplate_defect: false,
            foraminal_stenosis_left: false,
            foraminal_stenosis_right: false,
            herniation: false,
        }
    }

    /// Names of attributes whose value lies outside its allowed range
    pub fn out_of_range(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if !PFIRRMANN_RANGE.contains(&self.pfirrmann) {
            fields.push("pfirrmann");
        }
        if !NARROWING_RANGE.contains(&self.narrowing) {
            fields.push("narrowing");
        }
        if !STENOSIS_RANGE.contains(&self.central_canal_stenosis) {
            fields.push("central_canal_stenosis");
        }
        fields
    }

    pub fn flags(&self) -> [bool; 8] {
        [
            self.spondylolisthesis,
            self.upper_marrow,
            self.lower_marrow,
            self.upper_endplate_defect,
            self.lower_endplate_defect,
            self.foraminal_stenosis_left,
            self.foraminal_stenosis_right,
            self.herniation,
        ]
    }
}
