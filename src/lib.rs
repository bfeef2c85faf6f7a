//! spinepipe - validation pipeline for automated spinal imaging analysis
//!
//! A run loads a sagittal scan, detects the vertebrae, derives the intervertebral
//! disc (IVD) regions between consecutive vertebrae, grades each disc and writes the
//! grades to a CSV report. Every stage's output is checked against the data-model
//! invariants before the next stage starts.
//!
//! # Core Concepts
//!
//! - **Volume Source**: turns a directory of slice images plus geometry metadata and
//!   overrides into a validated [`Volume`]
//! - **Inference collaborators**: the detection and grading models, reached through
//!   the [`VertebraDetector`] and [`DiscGrader`] traits
//! - **Pipeline Coordinator**: sequences the stages, validates outputs and tracks the
//!   run through a state machine
//! - **Report Sink**: persists the finished [`Report`]
//!
//! # Example Usage
//!
//! ```no_run
//! use spinepipe::{HttpInferenceClient, InferenceConfig, PipelineCoordinator, RunRequest};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(HttpInferenceClient::new(InferenceConfig::default())?);
//! let coordinator = PipelineCoordinator::new(client.clone(), client);
//!
//! let request = RunRequest::new("scans/patient-07", "results/patient-07.csv")
//!     .require_complete_metadata(true);
//! let summary = coordinator.run(&request).await?;
//! println!("Graded {} discs", summary.discs());
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`model`]: data flowing between stages
//! - [`source`]: scan loading and metadata overrides
//! - [`inference`]: model collaborators, device selection, HTTP client and mock
//! - [`validation`]: invariant rules applied to stage outputs
//! - [`pipeline`]: coordinator, state machine and disc extraction
//! - [`report`]: CSV report sink
//! - [`progress`]: progress events and handlers

pub mod cli;
pub mod config;
pub mod inference;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod source;
pub mod util;
pub mod validation;

pub use config::{ConfigError, SpinepipeConfig};
pub use inference::{
    resolve_device, Device, DiscGrader, HttpInferenceClient, InferenceConfig, InferenceError,
    MockInference, VertebraDetector,
};
pub use model::{
    DiscId, Geometry, Grade, IvdRegion, Orientation, PixelSpacing, Report, VertebraDetection,
    VertebraLabel, Volume, VoxelBox,
};
pub use pipeline::{
    ErrorKind, PipelineCoordinator, PipelineError, PipelineState, RunOutcome, RunRequest,
    RunSummary, Stage,
};
pub use report::{CsvReportSink, ReportSink, SinkError};
pub use source::{
    merge_geometry, LoadError, MetadataOverride, MetadataPolicy, SliceDirectorySource,
    VolumeSource,
};
pub use util::{config_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
