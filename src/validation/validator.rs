use crate::model::Volume;
use crate::validation::rules::{
    AdjacentPairsRule, AnatomicalOrderRule, BoundsWithinVolumeRule, ConfidenceRangeRule,
    DetectionSet, GradeRangeRule, GradeSet, OneGradePerRegionRule, RegionCountRule, RegionSet,
    SpatialOrderRule, UniqueLabelsRule, ValidationRule, Violation, VolumeGeometryRule,
};

/// Checks each stage's output against the data-model invariants before the next stage runs
pub struct Validator {
    volume_rules: Vec<Box<dyn ValidationRule<Volume>>>,
    detection_rules: Vec<Box<dyn for<'a> ValidationRule<DetectionSet<'a>>>>,
    region_rules: Vec<Box<dyn for<'a> ValidationRule<RegionSet<'a>>>>,
    grade_rules: Vec<Box<dyn for<'a> ValidationRule<GradeSet<'a>>>>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate_volume(&self, volume: &Volume) -> Result<(), Violation> {
        for rule in &self.volume_rules {
            rule.validate(volume)
                .map_err(|message| Violation::new(rule.name(), message))?;
        }
        Ok(())
    }

    pub fn validate_detections(&self, set: &DetectionSet<'_>) -> Result<(), Violation> {
        for rule in &self.detection_rules {
            rule.validate(set)
                .map_err(|message| Violation::new(rule.name(), message))?;
        }
        Ok(())
    }

    pub fn validate_regions(&self, set: &RegionSet<'_>) -> Result<(), Violation> {
        for rule in &self.region_rules {
            rule.validate(set)
                .map_err(|message| Violation::new(rule.name(), message))?;
        }
        Ok(())
    }

    pub fn validate_grades(&self, set: &GradeSet<'_>) -> Result<(), Violation> {
        for rule in &self.grade_rules {
            rule.validate(set)
                .map_err(|message| Violation::new(rule.name(), message))?;
        }
        Ok(())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            volume_rules: vec![Box::new(VolumeGeometryRule)],
            detection_rules: vec![
                Box::new(UniqueLabelsRule),
                Box::new(AnatomicalOrderRule),
                Box::new(BoundsWithinVolumeRule),
                Box::new(SpatialOrderRule),
                Box::new(ConfidenceRangeRule),
            ],
            region_rules: vec![Box::new(RegionCountRule), Box::new(AdjacentPairsRule)],
            grade_rules: vec![Box::new(OneGradePerRegionRule), Box::new(GradeRangeRule)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        CraniocaudalAxis, Grade, IvdRegion, VertebraDetection, VolumeAxis, VoxelBox,
    };
    use ndarray::Array3;

    const SHAPE: [usize; 3] = [10, 200, 100];

    fn sagittal_axis() -> CraniocaudalAxis {
        CraniocaudalAxis {
            axis: VolumeAxis::Row,
            caudal_increasing: true,
        }
    }

    fn detection(id: u32, label: &str, top: usize) -> VertebraDetection {
        VertebraDetection::new(
            id,
            label.parse().unwrap(),
            VoxelBox::new([0, top, 20], [10, top + 30, 80]),
            0.9,
        )
    }

    fn lumbar() -> Vec<VertebraDetection> {
        vec![
            detection(1, "L1", 10),
            detection(2, "L2", 50),
            detection(3, "L3", 90),
        ]
    }

    fn regions_for(detections: &[VertebraDetection]) -> Vec<IvdRegion> {
        detections
            .windows(2)
            .map(|pair| {
                IvdRegion::between(
                    &pair[0],
                    &pair[1],
                    VoxelBox::new([0, 0, 0], [1, 1, 1]),
                    Array3::zeros((1, 1, 1)),
                )
                .unwrap()
            })
            .collect()
    }

    fn check(detections: &[VertebraDetection]) -> Result<(), Violation> {
        Validator::new().validate_detections(&DetectionSet {
            detections,
            shape: SHAPE,
            axis: sagittal_axis(),
        })
    }

    #[test]
    fn test_valid_detections() {
        assert!(check(&lumbar()).is_ok());
        assert!(check(&[]).is_ok());
    }

    #[test]
    fn test_duplicate_label() {
        let detections = vec![detection(1, "L1", 10), detection(2, "L1", 50)];
        let err = check(&detections).unwrap_err();
        assert_eq!(err.rule, "UniqueLabels");
    }

    #[test]
    fn test_out_of_order_labels() {
        let detections = vec![detection(1, "L2", 10), detection(2, "L1", 50)];
        let err = check(&detections).unwrap_err();
        assert_eq!(err.rule, "AnatomicalOrder");
        assert!(err.to_string().contains("[AnatomicalOrder]"));
    }

    #[test]
    fn test_non_adjacent_labels() {
        let detections = vec![detection(1, "L1", 10), detection(2, "L3", 50)];
        let err = check(&detections).unwrap_err();
        assert_eq!(err.rule, "AnatomicalOrder");
        assert!(err.message.contains("not anatomically adjacent"));
    }

    #[test]
    fn test_spatial_order_against_labels() {
        let detections = vec![detection(1, "L1", 90), detection(2, "L2", 10)];
        let err = check(&detections).unwrap_err();
        assert_eq!(err.rule, "SpatialOrder");
    }

    #[test]
    fn test_spatial_order_respects_direction() {
        let detections = vec![detection(1, "L1", 90), detection(2, "L2", 10)];
        let set = DetectionSet {
            detections: &detections,
            shape: SHAPE,
            axis: CraniocaudalAxis {
                axis: VolumeAxis::Row,
                caudal_increasing: false,
            },
        };
        assert!(Validator::new().validate_detections(&set).is_ok());
    }

    #[test]
    fn test_bounds_outside_volume() {
        let mut detections = lumbar();
        detections[2].bounds.end[1] = 500;
        assert_eq!(check(&detections).unwrap_err().rule, "BoundsWithinVolume");
    }

    #[test]
    fn test_confidence_range() {
        let mut detections = lumbar();
        detections[0].confidence = 1.2;
        assert_eq!(check(&detections).unwrap_err().rule, "ConfidenceRange");
    }

    #[test]
    fn test_region_count() {
        let detections = lumbar();
        let mut regions = regions_for(&detections);
        let validator = Validator::new();
        assert!(validator
            .validate_regions(&RegionSet {
                regions: &regions,
                detections: &detections,
            })
            .is_ok());

        regions.pop();
        let err = validator
            .validate_regions(&RegionSet {
                regions: &regions,
                detections: &detections,
            })
            .unwrap_err();
        assert_eq!(err.rule, "RegionCount");
    }

    #[test]
    fn test_regions_must_follow_detection_order() {
        let detections = lumbar();
        let mut regions = regions_for(&detections);
        regions.swap(0, 1);
        let err = Validator::new()
            .validate_regions(&RegionSet {
                regions: &regions,
                detections: &detections,
            })
            .unwrap_err();
        assert_eq!(err.rule, "AdjacentPairs");
    }

    #[test]
    fn test_grades_match_regions() {
        let detections = lumbar();
        let regions = regions_for(&detections);
        let grades: Vec<Grade> = regions.iter().map(|r| Grade::healthy(r.disc)).collect();
        let validator = Validator::new();
        assert!(validator
            .validate_grades(&GradeSet {
                grades: &grades,
                regions: &regions,
            })
            .is_ok());

        let dropped = &grades[..1];
        assert_eq!(
            validator
                .validate_grades(&GradeSet {
                    grades: dropped,
                    regions: &regions,
                })
                .unwrap_err()
                .rule,
            "OneGradePerRegion"
        );

        let mut reordered = grades.clone();
        reordered.reverse();
        assert_eq!(
            validator
                .validate_grades(&GradeSet {
                    grades: &reordered,
                    regions: &regions,
                })
                .unwrap_err()
                .rule,
            "OneGradePerRegion"
        );
    }

    #[test]
    fn test_grade_range() {
        let detections = lumbar();
        let regions = regions_for(&detections);
        let mut grades: Vec<Grade> = regions.iter().map(|r| Grade::healthy(r.disc)).collect();
        grades[1].narrowing = 9;
        let err = Validator::new()
            .validate_grades(&GradeSet {
                grades: &grades,
                regions: &regions,
            })
            .unwrap_err();
        assert_eq!(err.rule, "GradeRange");
        assert!(err.message.contains("narrowing"));
    }
}
