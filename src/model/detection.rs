//! Vertebra labels and detections

use super::volume::VolumeAxis;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid vertebra label '{0}': expected C1-C7, T1-T12, L1-L5 or S1")]
pub struct LabelParseError(pub String);

/// Spinal region, in cranio-caudal order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SpinalRegion {
    Cervical,
    Thoracic,
    Lumbar,
    Sacral,
}

impl SpinalRegion {
    pub fn prefix(self) -> char {
        match self {
            SpinalRegion::Cervical => 'C',
            SpinalRegion::Thoracic => 'T',
            SpinalRegion::Lumbar => 'L',
            SpinalRegion::Sacral => 'S',
        }
    }

    pub fn levels(self) -> u8 {
        match self {
            SpinalRegion::Cervical => 7,
            SpinalRegion::Thoracic => 12,
            SpinalRegion::Lumbar => 5,
            SpinalRegion::Sacral => 1,
        }
    }

    fn first_ordinal(self) -> u8 {
        match self {
            SpinalRegion::Cervical => 0,
            SpinalRegion::Thoracic => 7,
            SpinalRegion::Lumbar => 19,
            SpinalRegion::Sacral => 24,
        }
    }

    fn next(self) -> Option<Self> {
        match self {
            SpinalRegion::Cervical => Some(SpinalRegion::Thoracic),
            SpinalRegion::Thoracic => Some(SpinalRegion::Lumbar),
            SpinalRegion::Lumbar => Some(SpinalRegion::Sacral),
            SpinalRegion::Sacral => None,
        }
    }
}

/// Anatomical vertebra level such as `L4`. Ordering follows the spine from head to sacrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VertebraLabel {
    region: SpinalRegion,
    level: u8,
}

impl VertebraLabel {
    pub fn new(region: SpinalRegion, level: u8) -> Option<Self> {
        (1..=region.levels())
            .contains(&level)
            .then_some(Self { region, level })
    }

    pub fn region(&self) -> SpinalRegion {
        self.region
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    /// Position along the spine, C1 = 0
    pub fn ordinal(&self) -> u8 {
        self.region.first_ordinal() + self.level - 1
    }

    /// The vertebra directly below this one
    pub fn successor(&self) -> Option<Self> {
        if self.level < self.region.levels() {
            Some(Self {
                region: self.region,
                level: self.level + 1,
            })
        } else {
            self.region.next().map(|region| Self { region, level: 1 })
        }
    }

    pub fn is_followed_by(&self, other: &VertebraLabel) -> bool {
        self.successor().as_ref() == Some(other)
    }
}

impl fmt::Display for VertebraLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.region.prefix(), self.level)
    }
}

impl FromStr for VertebraLabel {
    type Err = LabelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let region = match chars.next().map(|c| c.to_ascii_uppercase()) {
            Some('C') => SpinalRegion::Cervical,
            Some('T') => SpinalRegion::Thoracic,
            Some('L') => SpinalRegion::Lumbar,
            Some('S') => SpinalRegion::Sacral,
            _ => return Err(LabelParseError(s.to_string())),
        };
        let level = chars
            .as_str()
            .parse::<u8>()
            .map_err(|_| LabelParseError(s.to_string()))?;
        Self::new(region, level).ok_or_else(|| LabelParseError(s.to_string()))
    }
}

impl TryFrom<String> for VertebraLabel {
    type Error = LabelParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VertebraLabel> for String {
    fn from(label: VertebraLabel) -> Self {
        label.to_string()
    }
}

/// Half-open voxel box, indices ordered (slice, row, column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoxelBox {
    pub start: [usize; 3],
    pub end: [usize; 3],
}

impl VoxelBox {
    pub fn new(start: [usize; 3], end: [usize; 3]) -> Self {
        Self { start, end }
    }

    pub fn extent(&self, axis: VolumeAxis) -> usize {
        let i = axis.index();
        self.end[i].saturating_sub(self.start[i])
    }

    pub fn center(&self, axis: VolumeAxis) -> f64 {
        let i = axis.index();
        (self.start[i] + self.end[i]) as f64 / 2.0
    }

    pub fn voxel_count(&self) -> usize {
        VolumeAxis::ALL.iter().map(|&a| self.extent(a)).product()
    }

    pub fn is_empty(&self) -> bool {
        self.voxel_count() == 0
    }

    pub fn fits_within(&self, shape: [usize; 3]) -> bool {
        (0..3).all(|i| self.start[i] <= self.end[i] && self.end[i] <= shape[i])
    }
}

impl fmt::Display for VoxelBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}..{}, {}..{}, {}..{}]",
            self.start[0], self.end[0], self.start[1], self.end[1], self.start[2], self.end[2]
        )
    }
}

/// One vertebral body found by the detection model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertebraDetection {
    pub id: u32,
    pub label: VertebraLabel,
    pub bounds: VoxelBox,
    pub confidence: f32,
}

impl VertebraDetection {
    pub fn new(id: u32, label: VertebraLabel, bounds: VoxelBox, confidence: f32) -> Self {
        Self {
            id,
            label,
            bounds,
            confidence,
        }
    }
}
