use super::error::PipelineError;
use super::extraction::{BoundaryInterpolation, DiscExtractor};
use super::stages;
use super::state::{PipelineState, Stage, StateMachine};
use crate::inference::{DiscGrader, VertebraDetector};
use crate::model::{Report, VertebraLabel, Volume};
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::report::{CsvReportSink, ReportSink, SinkError};
use crate::source::{LoadError, MetadataOverride, SliceDirectorySource, VolumeSource};
use crate::validation::{DetectionSet, GradeSet, RegionSet, Validator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Everything a single run needs from its caller
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub scan_dir: PathBuf,
    pub require_complete_metadata: bool,
    pub overrides: MetadataOverride,
    pub destination: PathBuf,
}

impl RunRequest {
    pub fn new(scan_dir: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            scan_dir: scan_dir.into(),
            require_complete_metadata: false,
            overrides: MetadataOverride::new(),
            destination: destination.into(),
        }
    }

    pub fn require_complete_metadata(mut self, required: bool) -> Self {
        self.require_complete_metadata = required;
        self
    }

    pub fn with_overrides(mut self, overrides: MetadataOverride) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub report: Report,
    pub destination: PathBuf,
    pub volume_shape: [usize; 3],
    pub detections: usize,
    /// Detected labels, head to feet
    pub vertebrae: Vec<VertebraLabel>,
    pub states: Vec<PipelineState>,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Number of discs graded and written
    pub fn discs(&self) -> usize {
        self.report.len()
    }
}

/// State history of a run alongside its result. The history ends in `Done` on
/// success and in `Failed` otherwise.
#[derive(Debug)]
pub struct RunOutcome {
    pub states: Vec<PipelineState>,
    pub result: Result<RunSummary, PipelineError>,
}

/// Sequences Volume Source, Detection, Disc Extraction, Grading and Report Sink,
/// validating each stage's output before the next one starts.
pub struct PipelineCoordinator {
    source: Arc<dyn VolumeSource>,
    detector: Arc<dyn VertebraDetector>,
    extractor: Arc<dyn DiscExtractor>,
    grader: Arc<dyn DiscGrader>,
    sink: Arc<dyn ReportSink>,
    validator: Validator,
    progress_handler: Option<Arc<dyn ProgressHandler>>,
}

impl PipelineCoordinator {
    pub fn new(detector: Arc<dyn VertebraDetector>, grader: Arc<dyn DiscGrader>) -> Self {
        Self {
            source: Arc::new(SliceDirectorySource::new()),
            detector,
            extractor: Arc::new(BoundaryInterpolation::new()),
            grader,
            sink: Arc::new(CsvReportSink::new()),
            validator: Validator::new(),
            progress_handler: None,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn VolumeSource>) -> Self {
        self.source = source;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn DiscExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_progress(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress_handler = Some(handler);
        self
    }

    pub async fn run(&self, request: &RunRequest) -> Result<RunSummary, PipelineError> {
        self.execute(request).await.result
    }

    pub async fn execute(&self, request: &RunRequest) -> RunOutcome {
        let start = Instant::now();
        info!("Starting pipeline run for: {}", request.scan_dir.display());
        self.emit(&ProgressEvent::Started {
            scan_dir: request.scan_dir.display().to_string(),
        });

        let mut machine = StateMachine::new();
        let result = self.drive(request, &mut machine, start).await;

        match &result {
            Ok(summary) => {
                info!(
                    discs = summary.discs(),
                    elapsed_ms = summary.elapsed.as_millis(),
                    "Pipeline complete: report written to {}",
                    summary.destination.display()
                );
                self.emit(&ProgressEvent::Completed {
                    discs: summary.discs(),
                    total_time: summary.elapsed,
                });
            }
            Err(err) => {
                error!(
                    stage = %err.stage,
                    kind = %err.kind(),
                    "Pipeline failed: {}",
                    err
                );
                machine.fail(err.stage, err.source.to_string());
                self.emit(&ProgressEvent::Failed {
                    stage: err.stage,
                    error: err.source.to_string(),
                });
            }
        }

        RunOutcome {
            states: machine.into_history(),
            result,
        }
    }

    async fn drive(
        &self,
        request: &RunRequest,
        machine: &mut StateMachine,
        start: Instant,
    ) -> Result<RunSummary, PipelineError> {
        let stage_start = self.begin(Stage::Load);
        let volume = self.load(request).await?;
        self.validator
            .validate_volume(&volume)
            .map_err(|e| PipelineError::new(Stage::Load, e))?;
        self.complete(Stage::Load, machine, stage_start)?;

        let stage_start = self.begin(Stage::Detection);
        let detections = stages::detect(self.detector.as_ref(), &volume)
            .await
            .map_err(|e| PipelineError::new(Stage::Detection, e))?;
        self.validator
            .validate_detections(&DetectionSet {
                detections: &detections,
                shape: volume.shape(),
                axis: volume.orientation().craniocaudal_axis(),
            })
            .map_err(|e| PipelineError::new(Stage::Detection, e))?;
        self.complete(Stage::Detection, machine, stage_start)?;

        let stage_start = self.begin(Stage::Extraction);
        let regions = self
            .extractor
            .extract(&detections, &volume)
            .map_err(|e| PipelineError::new(Stage::Extraction, e))?;
        self.validator
            .validate_regions(&RegionSet {
                regions: &regions,
                detections: &detections,
            })
            .map_err(|e| PipelineError::new(Stage::Extraction, e))?;
        debug!(
            extractor = self.extractor.name(),
            regions = regions.len(),
            "Disc regions extracted"
        );
        self.complete(Stage::Extraction, machine, stage_start)?;

        let stage_start = self.begin(Stage::Grading);
        if regions.is_empty() {
            info!(
                detections = detections.len(),
                "No disc regions; writing an empty report"
            );
        }
        let grades = stages::grade(self.grader.as_ref(), &regions)
            .await
            .map_err(|e| PipelineError::new(Stage::Grading, e))?;
        self.validator
            .validate_grades(&GradeSet {
                grades: &grades,
                regions: &regions,
            })
            .map_err(|e| PipelineError::new(Stage::Grading, e))?;
        let report = Report::from_grades(grades);
        self.complete(Stage::Grading, machine, stage_start)?;

        let stage_start = self.begin(Stage::Report);
        let destination = self.write(&report, &request.destination).await?;
        self.complete(Stage::Report, machine, stage_start)?;

        machine
            .advance(PipelineState::Done)
            .map_err(|e| PipelineError::new(Stage::Report, e))?;

        Ok(RunSummary {
            report,
            destination,
            volume_shape: volume.shape(),
            detections: detections.len(),
            vertebrae: detections.iter().map(|d| d.label).collect(),
            states: machine.history().to_vec(),
            elapsed: start.elapsed(),
        })
    }

    async fn load(&self, request: &RunRequest) -> Result<Volume, PipelineError> {
        let source = Arc::clone(&self.source);
        let scan_dir = request.scan_dir.clone();
        let overrides = request.overrides.clone();
        let require_complete = request.require_complete_metadata;

        tokio::task::spawn_blocking(move || source.load(&scan_dir, require_complete, &overrides))
            .await
            .map_err(|e| LoadError::Assembly(format!("loader task failed: {}", e)))
            .and_then(|loaded| loaded)
            .map_err(|e| PipelineError::new(Stage::Load, e))
    }

    async fn write(&self, report: &Report, destination: &Path) -> Result<PathBuf, PipelineError> {
        let sink = Arc::clone(&self.sink);
        let report = report.clone();
        let destination = destination.to_path_buf();

        tokio::task::spawn_blocking(move || sink.write(&report, &destination))
            .await
            .map_err(|e| SinkError::Worker(e.to_string()))
            .and_then(|written| written)
            .map_err(|e| PipelineError::new(Stage::Report, e))
    }

    fn begin(&self, stage: Stage) -> Instant {
        info!("[{}/{}] {}", stage.index(), Stage::TOTAL, stage);
        self.emit(&ProgressEvent::stage_started(stage));
        Instant::now()
    }

    fn complete(
        &self,
        stage: Stage,
        machine: &mut StateMachine,
        started: Instant,
    ) -> Result<(), PipelineError> {
        machine
            .advance(stage.completed_state())
            .map_err(|e| PipelineError::new(stage, e))?;
        self.emit(&ProgressEvent::stage_complete(stage, started.elapsed()));
        debug!("Stage {} complete", stage);
        Ok(())
    }

    fn emit(&self, event: &ProgressEvent) {
        if let Some(handler) = &self.progress_handler {
            handler.on_progress(event);
        }
    }
}
