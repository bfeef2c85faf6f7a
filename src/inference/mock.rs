use super::backend::{DiscGrader, InferenceService, ServiceHealth, VertebraDetector};
use super::device::Device;
use super::error::InferenceError;
use crate::model::{
    Grade, IvdRegion, PixelSpacing, VertebraDetection, VertebraLabel, Volume, VoxelBox,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Scripted stand-in for the inference service.
///
/// Detections are replayed on every call. Grades are either scripted or derived
/// deterministically from each crop's mean intensity.
pub struct MockInference {
    detections: Mutex<Result<Vec<VertebraDetection>, InferenceError>>,
    grades: Mutex<Option<Result<Vec<Grade>, InferenceError>>>,
    devices: Vec<Device>,
    detect_calls: AtomicUsize,
    grade_calls: AtomicUsize,
}

impl MockInference {
    pub fn new() -> Self {
        Self {
            detections: Mutex::new(Ok(Vec::new())),
            grades: Mutex::new(None),
            devices: vec![Device::Cpu],
            detect_calls: AtomicUsize::new(0),
            grade_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_detections(self, detections: Vec<VertebraDetection>) -> Self {
        *self.detections.lock().unwrap() = Ok(detections);
        self
    }

    pub fn with_grades(self, grades: Vec<Grade>) -> Self {
        *self.grades.lock().unwrap() = Some(Ok(grades));
        self
    }

    pub fn failing_detection(self, error: InferenceError) -> Self {
        *self.detections.lock().unwrap() = Err(error);
        self
    }

    pub fn failing_grading(self, error: InferenceError) -> Self {
        *self.grades.lock().unwrap() = Some(Err(error));
        self
    }

    pub fn with_devices(mut self, devices: Vec<Device>) -> Self {
        self.devices = devices;
        self
    }

    pub fn detect_calls(&self) -> usize {
        self.detect_calls.load(Ordering::SeqCst)
    }

    pub fn grade_calls(&self) -> usize {
        self.grade_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockInference {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceService for MockInference {
    fn name(&self) -> &str {
        "mock"
    }

    async fn health_check(&self) -> Result<ServiceHealth, InferenceError> {
        Ok(ServiceHealth {
            healthy: true,
            devices: self.devices.clone(),
            models: vec!["mock".to_string()],
        })
    }
}

#[async_trait]
impl VertebraDetector for MockInference {
    fn name(&self) -> &str {
        "mock"
    }

    async fn detect(
        &self,
        _volume: &Volume,
        _pixel_spacing: PixelSpacing,
    ) -> Result<Vec<VertebraDetection>, InferenceError> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        self.detections.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiscGrader for MockInference {
    fn name(&self) -> &str {
        "mock"
    }

    async fn grade(&self, regions: &[IvdRegion]) -> Result<Vec<Grade>, InferenceError> {
        self.grade_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(scripted) = self.grades.lock().unwrap().clone() {
            return scripted;
        }
        Ok(regions.iter().map(derived_grade).collect())
    }
}

fn derived_grade(region: &IvdRegion) -> Grade {
    let mean = region.voxels.mean().unwrap_or(0.0);
    let bucket = (mean.max(0.0) as u64 % 5) as u8;
    let mut grade = Grade::healthy(region.disc);
    grade.pfirrmann = bucket + 1;
    grade.narrowing = bucket.min(3);
    grade.herniation = bucket >= 3;
    grade
}

/// Detections for consecutive `labels`, stacked evenly along the row axis of a
/// sagittal volume with the given shape and spanning every slice and the middle columns
pub fn stacked_detections(labels: &[VertebraLabel], shape: [usize; 3]) -> Vec<VertebraDetection> {
    let [slices, rows, columns] = shape;
    let count = labels.len().max(1);
    let band = rows / (count + 1);
    labels
        .iter()
        .enumerate()
        .map(|(i, &label)| {
            let top = band / 2 + i * band;
            VertebraDetection::new(
                i as u32 + 1,
                label,
                VoxelBox::new(
                    [0, top, columns / 4],
                    [slices, top + (band * 3 / 4).max(1), columns * 3 / 4],
                ),
                0.95,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stacked_detections_are_ordered_and_within_volume() {
        let labels: Vec<VertebraLabel> = ["L1", "L2", "L3"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let detections = stacked_detections(&labels, [10, 100, 80]);
        assert_eq!(detections.len(), 3);
        for pair in detections.windows(2) {
            assert!(pair[0].bounds.start[1] < pair[1].bounds.start[1]);
        }
        assert!(detections
            .iter()
            .all(|d| d.bounds.fits_within([10, 100, 80]) && !d.bounds.is_empty()));
    }

    #[tokio::test]
    async fn test_health_reports_devices() {
        let mock = MockInference::new().with_devices(vec![Device::Cpu, Device::Cuda(0)]);
        let health = mock.health_check().await.unwrap();
        assert!(health.healthy);
        assert_eq!(health.devices.len(), 2);
    }
}
