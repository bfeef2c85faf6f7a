//! Stage contracts wrapped around the inference collaborators

use crate::inference::{DiscGrader, InferenceError, VertebraDetector};
use crate::model::{Grade, IvdRegion, VertebraDetection, Volume};
use tracing::{debug, info};

/// Rejects input the detector cannot run on
pub fn check_detection_input(volume: &Volume) -> Result<(), InferenceError> {
    if volume.rank() != 3 {
        return Err(InferenceError::MalformedInput(format!(
            "expected a rank 3 volume, got rank {}",
            volume.rank()
        )));
    }
    if volume.shape().iter().any(|&n| n == 0) {
        return Err(InferenceError::MalformedInput(format!(
            "volume has an empty axis: {:?}",
            volume.shape()
        )));
    }
    volume
        .pixel_spacing()
        .validate()
        .map_err(|e| InferenceError::MalformedInput(e.to_string()))
}

pub async fn detect(
    detector: &dyn VertebraDetector,
    volume: &Volume,
) -> Result<Vec<VertebraDetection>, InferenceError> {
    check_detection_input(volume)?;
    let detections = detector.detect(volume, volume.pixel_spacing()).await?;
    let labels: Vec<String> = detections.iter().map(|d| d.label.to_string()).collect();
    info!(
        detector = detector.name(),
        count = detections.len(),
        labels = ?labels,
        "Detected {} vertebrae",
        detections.len()
    );
    Ok(detections)
}

/// Every crop must hold at least one voxel before the grader sees it
pub fn check_crops(regions: &[IvdRegion]) -> Result<(), InferenceError> {
    match regions.iter().find(|r| r.is_degenerate()) {
        Some(region) => Err(InferenceError::DegenerateCrop {
            disc: region.disc.to_string(),
            crop: region.crop.to_string(),
        }),
        None => Ok(()),
    }
}

/// Grades every region in order. With no regions the grader is not consulted.
pub async fn grade(
    grader: &dyn DiscGrader,
    regions: &[IvdRegion],
) -> Result<Vec<Grade>, InferenceError> {
    if regions.is_empty() {
        debug!("No disc regions to grade");
        return Ok(Vec::new());
    }
    check_crops(regions)?;
    let grades = grader.grade(regions).await?;
    info!(
        grader = grader.name(),
        count = grades.len(),
        "Grading complete"
    );
    Ok(grades)
}
