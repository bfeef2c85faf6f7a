use super::device::Device;
use thiserror::Error;

/// Errors raised by the inference stages or their collaborators
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    /// The stage received input it cannot run on
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A disc crop with no voxels
    #[error("degenerate crop for disc {disc}: {crop}")]
    DegenerateCrop { disc: String, crop: String },

    #[error("request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("inference service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid response from inference service: {0}")]
    InvalidResponse(String),

    #[error("device {requested} is not available (service offers: {available})")]
    DeviceUnavailable { requested: Device, available: String },

    #[error("{0}")]
    Other(String),
}
