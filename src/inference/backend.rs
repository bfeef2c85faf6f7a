//! Collaborator contracts for the detection and grading models
//!
//! The models are black boxes behind these traits. Implementations receive immutable
//! inputs and return newly owned outputs; the pipeline awaits each call before moving on.

use super::device::Device;
use super::error::InferenceError;
use crate::model::{Grade, IvdRegion, PixelSpacing, VertebraDetection, Volume};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// State reported by an inference service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub healthy: bool,
    /// Devices the service can run models on
    pub devices: Vec<Device>,
    #[serde(default)]
    pub models: Vec<String>,
}

#[async_trait]
pub trait InferenceService: Send + Sync {
    fn name(&self) -> &str;

    async fn health_check(&self) -> Result<ServiceHealth, InferenceError>;
}

/// Finds vertebral bodies in a volume.
///
/// Output is expected cranio-caudally ordered with one detection per label. An empty
/// result means no vertebrae were found and is not an error.
#[async_trait]
pub trait VertebraDetector: Send + Sync {
    fn name(&self) -> &str;

    async fn detect(
        &self,
        volume: &Volume,
        pixel_spacing: PixelSpacing,
    ) -> Result<Vec<VertebraDetection>, InferenceError>;
}

/// Grades disc regions, one grade per region in input order
#[async_trait]
pub trait DiscGrader: Send + Sync {
    fn name(&self) -> &str;

    async fn grade(&self, regions: &[IvdRegion]) -> Result<Vec<Grade>, InferenceError>;
}
