use crate::model::{CraniocaudalAxis, Grade, IvdRegion, VertebraDetection, Volume};
use std::collections::HashSet;
use thiserror::Error;

/// A data-model invariant that a stage output failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{rule}] {message}")]
pub struct Violation {
    pub rule: &'static str,
    pub message: String,
}

impl Violation {
    pub fn new(rule: &'static str, message: impl Into<String>) -> Self {
        Self {
            rule,
            message: message.into(),
        }
    }
}

pub trait ValidationRule<T: ?Sized>: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, subject: &T) -> Result<(), String>;
}

/// Detection output together with what it is checked against
pub struct DetectionSet<'a> {
    pub detections: &'a [VertebraDetection],
    pub shape: [usize; 3],
    pub axis: CraniocaudalAxis,
}

/// Extraction output together with the detections it was derived from
pub struct RegionSet<'a> {
    pub regions: &'a [IvdRegion],
    pub detections: &'a [VertebraDetection],
}

/// Grading output together with the regions that were graded
pub struct GradeSet<'a> {
    pub grades: &'a [Grade],
    pub regions: &'a [IvdRegion],
}

pub struct VolumeGeometryRule;

impl ValidationRule<Volume> for VolumeGeometryRule {
    fn name(&self) -> &'static str {
        "VolumeGeometry"
    }

    fn validate(&self, volume: &Volume) -> Result<(), String> {
        if volume.rank() != 3 {
            return Err(format!("Volume rank must be 3, got {}", volume.rank()));
        }
        if volume.shape().iter().any(|&n| n == 0) {
            return Err(format!("Volume has an empty axis: {:?}", volume.shape()));
        }
        volume.geometry().validate().map_err(|e| e.to_string())
    }
}

pub struct UniqueLabelsRule;

impl<'a> ValidationRule<DetectionSet<'a>> for UniqueLabelsRule {
    fn name(&self) -> &'static str {
        "UniqueLabels"
    }

    fn validate(&self, set: &DetectionSet<'a>) -> Result<(), String> {
        let mut labels = HashSet::new();
        let mut ids = HashSet::new();
        for detection in set.detections {
            if !labels.insert(detection.label) {
                return Err(format!("Label {} detected more than once", detection.label));
            }
            if !ids.insert(detection.id) {
                return Err(format!("Detection id {} is not unique", detection.id));
            }
        }
        Ok(())
    }
}

pub struct AnatomicalOrderRule;

impl<'a> ValidationRule<DetectionSet<'a>> for AnatomicalOrderRule {
    fn name(&self) -> &'static str {
        "AnatomicalOrder"
    }

    fn validate(&self, set: &DetectionSet<'a>) -> Result<(), String> {
        for pair in set.detections.windows(2) {
            let (upper, lower) = (&pair[0], &pair[1]);
            if upper.label >= lower.label {
                return Err(format!(
                    "Labels out of cranio-caudal order: {} precedes {}",
                    upper.label, lower.label
                ));
            }
            if !upper.label.is_followed_by(&lower.label) {
                return Err(format!(
                    "Labels {} and {} are not anatomically adjacent",
                    upper.label, lower.label
                ));
            }
        }
        Ok(())
    }
}

pub struct SpatialOrderRule;

impl<'a> ValidationRule<DetectionSet<'a>> for SpatialOrderRule {
    fn name(&self) -> &'static str {
        "SpatialOrder"
    }

    fn validate(&self, set: &DetectionSet<'a>) -> Result<(), String> {
        let axis = set.axis;
        for pair in set.detections.windows(2) {
            let upper = pair[0].bounds.center(axis.axis);
            let lower = pair[1].bounds.center(axis.axis);
            let descending = if axis.caudal_increasing {
                lower > upper
            } else {
                lower < upper
            };
            if !descending {
                return Err(format!(
                    "{} (centre {:.1}) is not caudal to {} (centre {:.1}) along the {:?} axis",
                    pair[1].label, lower, pair[0].label, upper, axis.axis
                ));
            }
        }
        Ok(())
    }
}

pub struct BoundsWithinVolumeRule;

impl<'a> ValidationRule<DetectionSet<'a>> for BoundsWithinVolumeRule {
    fn name(&self) -> &'static str {
        "BoundsWithinVolume"
    }

    fn validate(&self, set: &DetectionSet<'a>) -> Result<(), String> {
        for detection in set.detections {
            if !detection.bounds.fits_within(set.shape) {
                return Err(format!(
                    "{} bounds {} exceed volume shape {:?}",
                    detection.label, detection.bounds, set.shape
                ));
            }
            if detection.bounds.is_empty() {
                return Err(format!("{} has empty bounds {}", detection.label, detection.bounds));
            }
        }
        Ok(())
    }
}

pub struct ConfidenceRangeRule;

impl<'a> ValidationRule<DetectionSet<'a>> for ConfidenceRangeRule {
    fn name(&self) -> &'static str {
        "ConfidenceRange"
    }

    fn validate(&self, set: &DetectionSet<'a>) -> Result<(), String> {
        for detection in set.detections {
            if !(0.0..=1.0).contains(&detection.confidence) {
                return Err(format!(
                    "Confidence for {} must be between 0.0 and 1.0, got {}",
                    detection.label, detection.confidence
                ));
            }
        }
        Ok(())
    }
}

pub struct RegionCountRule;

impl<'a> ValidationRule<RegionSet<'a>> for RegionCountRule {
    fn name(&self) -> &'static str {
        "RegionCount"
    }

    fn validate(&self, set: &RegionSet<'a>) -> Result<(), String> {
        let expected = set.detections.len().saturating_sub(1);
        if set.regions.len() != expected {
            return Err(format!(
                "Expected {} disc regions for {} detections, got {}",
                expected,
                set.detections.len(),
                set.regions.len()
            ));
        }
        Ok(())
    }
}

pub struct AdjacentPairsRule;

impl<'a> ValidationRule<RegionSet<'a>> for AdjacentPairsRule {
    fn name(&self) -> &'static str {
        "AdjacentPairs"
    }

    fn validate(&self, set: &RegionSet<'a>) -> Result<(), String> {
        for (region, pair) in set.regions.iter().zip(set.detections.windows(2)) {
            if region.upper != pair[0].id || region.lower != pair[1].id {
                return Err(format!(
                    "Region {} references detections {}/{} but consecutive detections are {}/{}",
                    region.disc, region.upper, region.lower, pair[0].id, pair[1].id
                ));
            }
            if region.disc.upper() != pair[0].label || region.disc.lower() != pair[1].label {
                return Err(format!(
                    "Region {} does not match labels {}-{}",
                    region.disc, pair[0].label, pair[1].label
                ));
            }
        }
        Ok(())
    }
}

pub struct OneGradePerRegionRule;

impl<'a> ValidationRule<GradeSet<'a>> for OneGradePerRegionRule {
    fn name(&self) -> &'static str {
        "OneGradePerRegion"
    }

    fn validate(&self, set: &GradeSet<'a>) -> Result<(), String> {
        if set.grades.len() != set.regions.len() {
            return Err(format!(
                "Expected {} grades, got {}",
                set.regions.len(),
                set.grades.len()
            ));
        }
        for (i, (grade, region)) in set.grades.iter().zip(set.regions).enumerate() {
            if grade.disc != region.disc {
                return Err(format!(
                    "Grade {} is for {} but region {} is {}",
                    i, grade.disc, i, region.disc
                ));
            }
        }
        Ok(())
    }
}

pub struct GradeRangeRule;

impl<'a> ValidationRule<GradeSet<'a>> for GradeRangeRule {
    fn name(&self) -> &'static str {
        "GradeRange"
    }

    fn validate(&self, set: &GradeSet<'a>) -> Result<(), String> {
        for grade in set.grades {
            let fields = grade.out_of_range();
            if !fields.is_empty() {
                return Err(format!(
                    "Grade for {} has out-of-range values: {}",
                    grade.disc,
                    fields.join(", ")
                ));
            }
        }
        Ok(())
    }
}
