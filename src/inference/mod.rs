//! Inference collaborators: detection and grading models behind request/response contracts

pub mod backend;
pub mod config;
pub mod device;
mod error;
pub mod http;
pub mod mock;

pub use backend::{DiscGrader, InferenceService, ServiceHealth, VertebraDetector};
pub use config::InferenceConfig;
pub use device::{resolve_device, Device};
pub use error::InferenceError;
pub use http::HttpInferenceClient;
pub use mock::MockInference;
