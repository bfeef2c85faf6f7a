//! Intervertebral disc regions

use super::detection::{LabelParseError, VertebraDetection, VertebraLabel, VoxelBox};
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscIdError {
    #[error("disc identifier '{0}' must have the form UPPER-LOWER, e.g. L4-L5")]
    Malformed(String),

    #[error(transparent)]
    Label(#[from] LabelParseError),

    #[error("{upper} and {lower} are not adjacent vertebrae")]
    NotAdjacent {
        upper: VertebraLabel,
        lower: VertebraLabel,
    },
}

/// Identifies a disc by the two vertebrae bounding it, e.g. `L4-L5`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiscId {
    upper: VertebraLabel,
    lower: VertebraLabel,
}

impl DiscId {
    pub fn between(upper: VertebraLabel, lower: VertebraLabel) -> Result<Self, DiscIdError> {
        if upper.is_followed_by(&lower) {
            Ok(Self { upper, lower })
        } else {
            Err(DiscIdError::NotAdjacent { upper, lower })
        }
    }

    pub fn upper(&self) -> VertebraLabel {
        self.upper
    }

    pub fn lower(&self) -> VertebraLabel {
        self.lower
    }
}

impl fmt::Display for DiscId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.upper, self.lower)
    }
}

impl FromStr for DiscId {
    type Err = DiscIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (upper, lower) = s
            .split_once('-')
            .ok_or_else(|| DiscIdError::Malformed(s.to_string()))?;
        Self::between(upper.parse()?, lower.parse()?)
    }
}

impl TryFrom<String> for DiscId {
    type Error = DiscIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DiscId> for String {
    fn from(id: DiscId) -> Self {
        id.to_string()
    }
}

/// Disc region bounded by two consecutive detections, with its cropped sub-volume
#[derive(Debug, Clone)]
pub struct IvdRegion {
    pub disc: DiscId,
    /// Detection id of the vertebra above the disc
    pub upper: u32,
    /// Detection id of the vertebra below the disc
    pub lower: u32,
    pub crop: VoxelBox,
    pub voxels: Array3<f32>,
}

impl IvdRegion {
    /// Builds a region from two detections, refusing pairs that are not anatomically adjacent
    pub fn between(
        upper: &VertebraDetection,
        lower: &VertebraDetection,
        crop: VoxelBox,
        voxels: Array3<f32>,
    ) -> Result<Self, DiscIdError> {
        Ok(Self {
            disc: DiscId::between(upper.label, lower.label)?,
            upper: upper.id,
            lower: lower.id,
            crop,
            voxels,
        })
    }

    pub fn is_degenerate(&self) -> bool {
        self.crop.is_empty() || self.voxels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disc_id_roundtrip_text() {
        let id: DiscId = "L4-L5".parse().unwrap();
        assert_eq!(id.to_string(), "L4-L5");
        assert_eq!(id.upper().to_string(), "L4");
        assert_eq!(id.lower().to_string(), "L5");
    }

    #[test]
    fn test_disc_id_rejects_non_adjacent() {
        let err = "L1-L3".parse::<DiscId>().unwrap_err();
        assert!(matches!(err, DiscIdError::NotAdjacent { .. }));
        assert!("L2-L1".parse::<DiscId>().is_err());
    }

    #[test]
    fn test_disc_id_rejects_malformed() {
        assert!(matches!(
            "L4L5".parse::<DiscId>(),
            Err(DiscIdError::Malformed(_))
        ));
        assert!(matches!(
            "L4-X5".parse::<DiscId>(),
            Err(DiscIdError::Label(_))
        ));
    }

    #[test]
    fn test_disc_ids_sort_along_spine() {
        let a: DiscId = "T12-L1".parse().unwrap();
        let b: DiscId = "L5-S1".parse().unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_region_between_detections() {
        let upper = VertebraDetection::new(
            1,
            "L1".parse().unwrap(),
            VoxelBox::new([0, 0, 0], [2, 2, 2]),
            0.9,
        );
        let lower = VertebraDetection::new(
            2,
            "L2".parse().unwrap(),
            VoxelBox::new([0, 2, 0], [2, 4, 2]),
            0.9,
        );
        let crop = VoxelBox::new([0, 1, 0], [2, 3, 2]);
        let region = IvdRegion::between(&upper, &lower, crop, Array3::zeros((2, 2, 2))).unwrap();
        assert_eq!(region.disc.to_string(), "L1-L2");
        assert_eq!((region.upper, region.lower), (1, 2));
        assert!(!region.is_degenerate());

        assert!(IvdRegion::between(&lower, &upper, crop, Array3::zeros((2, 2, 2))).is_err());
    }
}
