//! Configuration management for spinepipe
//!
//! Settings are loaded from environment variables with sensible defaults; command line
//! flags override them in the binary.
//!
//! # Environment Variables
//!
//! - `SPINEPIPE_ENDPOINT`: Inference service base URL - default: "http://localhost:8731"
//! - `SPINEPIPE_DEVICE`: Compute device (auto|cpu|cuda|cuda:N) - default: "auto"
//! - `SPINEPIPE_DETECTION_MODEL`: Vertebra detection model - default: "vertebra-detector"
//! - `SPINEPIPE_GRADING_MODEL`: Disc grading model - default: "ivd-grader"
//! - `SPINEPIPE_REQUEST_TIMEOUT`: Inference request timeout in seconds - default: "120"
//! - `SPINEPIPE_OUTPUT_DIR`: Directory for reports without an explicit path - default: "results"
//! - `SPINEPIPE_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use spinepipe::SpinepipeConfig;
//!
//! let config = SpinepipeConfig::default();
//! config.validate().expect("Invalid configuration");
//! let inference = config.inference_config().expect("Invalid device");
//! println!("{}", inference.endpoint);
//! ```

use crate::inference::config::{
    DEFAULT_DETECTION_MODEL, DEFAULT_ENDPOINT, DEFAULT_GRADING_MODEL, DEFAULT_TIMEOUT_SECS,
};
use crate::inference::{Device, InferenceConfig};
use serde::Serialize;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_DEVICE: &str = "auto";
const DEFAULT_OUTPUT_DIR: &str = "results";
const DEFAULT_LOG_LEVEL: &str = "info";
const MAX_REQUEST_TIMEOUT_SECS: u64 = 1800;

/// Default report file name inside the output directory
pub const DEFAULT_REPORT_FILE: &str = "report.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid device: {0}")]
    InvalidDevice(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct SpinepipeConfig {
    /// Inference service base URL
    pub endpoint: String,

    /// Requested compute device, as given (resolved against the service before a run)
    pub device: String,

    pub detection_model: String,

    pub grading_model: String,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Directory receiving reports when no explicit path is given
    pub output_dir: PathBuf,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for SpinepipeConfig {
    /// Loads configuration from `SPINEPIPE_*` environment variables, falling back to defaults
    fn default() -> Self {
        let endpoint =
            env::var("SPINEPIPE_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

        let device = env::var("SPINEPIPE_DEVICE")
            .unwrap_or_else(|_| DEFAULT_DEVICE.to_string())
            .to_lowercase();

        let detection_model = env::var("SPINEPIPE_DETECTION_MODEL")
            .unwrap_or_else(|_| DEFAULT_DETECTION_MODEL.to_string());

        let grading_model = env::var("SPINEPIPE_GRADING_MODEL")
            .unwrap_or_else(|_| DEFAULT_GRADING_MODEL.to_string());

        let request_timeout_secs = env::var("SPINEPIPE_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let output_dir = env::var("SPINEPIPE_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let log_level = env::var("SPINEPIPE_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            endpoint,
            device,
            detection_model,
            grading_model,
            request_timeout_secs,
            output_dir,
            log_level,
        }
    }
}

impl SpinepipeConfig {
    /// Checks that the endpoint is an HTTP URL, the device parses, the timeout is
    /// within 1..=1800 seconds and the log level is known.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(ConfigError::ValidationFailed(format!(
                "Endpoint must start with http:// or https://, got {}",
                self.endpoint
            )));
        }

        self.device()?;

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
            return Err(ConfigError::ValidationFailed(
                "Request timeout cannot exceed 30 minutes".to_string(),
            ));
        }

        if self.detection_model.trim().is_empty() || self.grading_model.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Model names must not be empty".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn device(&self) -> Result<Device, ConfigError> {
        self.device.parse().map_err(ConfigError::InvalidDevice)
    }

    pub fn inference_config(&self) -> Result<InferenceConfig, ConfigError> {
        Ok(InferenceConfig {
            endpoint: self.endpoint.clone(),
            device: self.device()?,
            detection_model: self.detection_model.clone(),
            grading_model: self.grading_model.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        })
    }

    /// Report path used when the caller gives none
    pub fn default_report_path(&self) -> PathBuf {
        self.output_dir.join(DEFAULT_REPORT_FILE)
    }

    /// Report path for a scan directory: `<output_dir>/<scan name>.csv`
    pub fn report_path_for(&self, scan_dir: &Path) -> PathBuf {
        match scan_dir.file_name().and_then(|n| n.to_str()) {
            Some(name) if !name.is_empty() => self.output_dir.join(format!("{}.csv", name)),
            _ => self.default_report_path(),
        }
    }
}

impl fmt::Display for SpinepipeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Spinepipe Configuration:")?;
        writeln!(f, "  Endpoint: {}", self.endpoint)?;
        writeln!(f, "  Device: {}", self.device)?;
        writeln!(f, "  Detection Model: {}", self.detection_model)?;
        writeln!(f, "  Grading Model: {}", self.grading_model)?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Output Dir: {}", self.output_dir.display())?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
