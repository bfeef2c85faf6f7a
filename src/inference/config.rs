//! Explicit model and device configuration handed to the inference collaborators

use super::device::Device;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8731";
pub const DEFAULT_DETECTION_MODEL: &str = "vertebra-detector";
pub const DEFAULT_GRADING_MODEL: &str = "ivd-grader";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Everything a collaborator needs to reach its model. Each pipeline owns its own copy,
/// so runs with different devices or models can proceed side by side.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceConfig {
    /// Base URL of the inference service
    pub endpoint: String,
    pub device: Device,
    pub detection_model: String,
    pub grading_model: String,
    pub timeout: Duration,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            device: Device::Auto,
            detection_model: DEFAULT_DETECTION_MODEL.to_string(),
            grading_model: DEFAULT_GRADING_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl InferenceConfig {
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Endpoint URL for an API path, without doubled slashes
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
