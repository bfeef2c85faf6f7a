//! End-to-end pipeline scenarios
//!
//! Each test writes a scan directory of PNG slices, drives the coordinator with the
//! scripted inference collaborator and inspects the resulting states and CSV report.

mod support;

use ndarray::Array3;
use serial_test::serial;
use spinepipe::inference::mock::stacked_detections;
use spinepipe::model::{IvdRegion, VertebraDetection, Volume, VoxelBox};
use spinepipe::pipeline::{BoundaryInterpolation, DiscExtractor, StageError};
use spinepipe::progress::{ProgressEvent, ProgressHandler};
use spinepipe::source::GeometryField;
use spinepipe::validation::Violation;
use spinepipe::{
    ErrorKind, Grade, InferenceError, LoadError, MetadataOverride, MockInference,
    PipelineCoordinator, PipelineState, RunOutcome, RunRequest, Stage,
};
use std::fs;
use std::sync::{Arc, Mutex};
use support::{labels, lumbar_detections, ScanFixture, SCAN_SHAPE};
use yare::parameterized;

fn coordinator(mock: &Arc<MockInference>) -> PipelineCoordinator {
    PipelineCoordinator::new(mock.clone(), mock.clone())
}

fn request(fixture: &ScanFixture) -> RunRequest {
    RunRequest::new(&fixture.scan_dir, &fixture.report)
}

fn run_blocking(coordinator: &PipelineCoordinator, request: &RunRequest) -> RunOutcome {
    tokio::runtime::Runtime::new()
        .unwrap()
        .block_on(coordinator.execute(request))
}

fn failed_at(outcome: &RunOutcome) -> Option<Stage> {
    match outcome.states.last() {
        Some(PipelineState::Failed { stage, .. }) => Some(*stage),
        _ => None,
    }
}

#[tokio::test]
async fn test_lumbar_scan_produces_four_discs() {
    let fixture = ScanFixture::complete();
    let mock = Arc::new(MockInference::new().with_detections(lumbar_detections()));

    let summary = coordinator(&mock)
        .run(&request(&fixture).require_complete_metadata(true))
        .await
        .unwrap();

    assert_eq!(summary.volume_shape, SCAN_SHAPE);
    assert_eq!(summary.detections, 5);
    assert_eq!(summary.vertebrae, labels(&["L1", "L2", "L3", "L4", "L5"]));
    assert_eq!(summary.discs(), 4);
    assert_eq!(summary.states.last(), Some(&PipelineState::Done));

    let text = fixture.report_text();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("disc,pfirrmann,narrowing,"));
    let discs: Vec<&str> = lines[1..]
        .iter()
        .map(|l| l.split(',').next().unwrap())
        .collect();
    assert_eq!(discs, vec!["L1-L2", "L2-L3", "L3-L4", "L4-L5"]);
    assert_eq!(mock.detect_calls(), 1);
    assert_eq!(mock.grade_calls(), 1);
}

#[parameterized(
    no_detections = { &[] },
    single_detection = { &["L3"] },
)]
#[serial]
fn test_too_few_detections_write_header_only(names: &[&str]) {
    let fixture = ScanFixture::complete();
    let mock = Arc::new(
        MockInference::new().with_detections(stacked_detections(&labels(names), SCAN_SHAPE)),
    );

    let outcome = run_blocking(&coordinator(&mock), &request(&fixture));

    let summary = outcome.result.unwrap();
    assert!(summary.report.is_empty());
    assert_eq!(mock.grade_calls(), 0);
    assert_eq!(fixture.report_text().lines().count(), 1);
    assert_eq!(outcome.states.last(), Some(&PipelineState::Done));
}

#[parameterized(
    two_vertebrae = { &["L4", "L5"], 1 },
    thoracolumbar = { &["T11", "T12", "L1", "L2"], 3 },
    full_lumbar = { &["L1", "L2", "L3", "L4", "L5"], 4 },
    into_sacrum = { &["L3", "L4", "L5", "S1"], 3 },
)]
#[serial]
fn test_region_count_is_one_less_than_detections(names: &[&str], discs: usize) {
    let fixture = ScanFixture::complete();
    let mock = Arc::new(
        MockInference::new().with_detections(stacked_detections(&labels(names), SCAN_SHAPE)),
    );

    let summary = run_blocking(&coordinator(&mock), &request(&fixture))
        .result
        .unwrap();

    assert_eq!(summary.discs(), discs);
    assert_eq!(summary.discs(), names.len() - 1);
    assert_eq!(fixture.report_text().lines().count(), discs + 1);
}

#[tokio::test]
async fn test_missing_orientation_with_complete_metadata_required() {
    let fixture = ScanFixture::new(
        SCAN_SHAPE,
        Some(r#"{"pixel_spacing": [0.5, 0.5], "slice_thickness": 2}"#),
    );
    let mock = Arc::new(MockInference::new().with_detections(lumbar_detections()));

    let outcome = coordinator(&mock)
        .execute(&request(&fixture).require_complete_metadata(true))
        .await;

    let err = outcome.result.unwrap_err();
    assert_eq!(err.stage, Stage::Load);
    assert_eq!(err.kind(), ErrorKind::LoadError);
    assert!(matches!(
        err.source,
        StageError::Load(LoadError::MissingGeometry(GeometryField::Orientation))
    ));
    assert_eq!(
        outcome.states,
        vec![
            PipelineState::Init,
            PipelineState::Failed {
                stage: Stage::Load,
                reason: err.source.to_string(),
            },
        ]
    );
    assert_eq!(mock.detect_calls(), 0);
    assert!(!fixture.report.exists());
}

#[tokio::test]
async fn test_missing_orientation_defaults_when_not_required() {
    let fixture = ScanFixture::new(
        SCAN_SHAPE,
        Some(r#"{"pixel_spacing": [0.5, 0.5], "slice_thickness": 2}"#),
    );
    let mock = Arc::new(MockInference::new().with_detections(lumbar_detections()));

    let summary = coordinator(&mock)
        .run(&request(&fixture).require_complete_metadata(false))
        .await
        .unwrap();

    assert_eq!(summary.discs(), 4);
}

#[tokio::test]
async fn test_overrides_fill_missing_sidecar() {
    let fixture = ScanFixture::new(SCAN_SHAPE, None);
    let overrides = MetadataOverride::from_entries([
        "PixelSpacing=0.5,0.5",
        "SliceThickness=2",
        "orientation=0,1,0,0,0,-1",
    ])
    .unwrap();
    let mock = Arc::new(MockInference::new().with_detections(lumbar_detections()));

    let summary = coordinator(&mock)
        .run(
            &request(&fixture)
                .require_complete_metadata(true)
                .with_overrides(overrides),
        )
        .await
        .unwrap();

    assert_eq!(summary.discs(), 4);
}

#[tokio::test]
async fn test_invalid_override_is_a_load_error() {
    let fixture = ScanFixture::complete();
    let overrides = MetadataOverride::new().with(GeometryField::SliceThickness, vec![-1.0]);
    let mock = Arc::new(MockInference::new().with_detections(lumbar_detections()));

    let err = coordinator(&mock)
        .run(&request(&fixture).with_overrides(overrides))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::LoadError);
    assert_eq!(mock.detect_calls(), 0);
}

#[tokio::test]
async fn test_runs_are_idempotent() {
    let fixture = ScanFixture::complete();
    let mock = Arc::new(MockInference::new().with_detections(lumbar_detections()));
    let coordinator = coordinator(&mock);

    coordinator.run(&request(&fixture)).await.unwrap();
    let first = fs::read(&fixture.report).unwrap();
    coordinator.run(&request(&fixture)).await.unwrap();
    let second = fs::read(&fixture.report).unwrap();

    assert_eq!(first, second);
}

#[parameterized(
    duplicate = { &["L1", "L2", "L2", "L3"] },
    skipped_level = { &["L1", "L2", "L4", "L5"] },
    out_of_order = { &["L2", "L1", "L3"] },
)]
#[serial]
fn test_inconsistent_labels_fail_detection(names: &[&str]) {
    let fixture = ScanFixture::complete();
    let mock = Arc::new(
        MockInference::new().with_detections(stacked_detections(&labels(names), SCAN_SHAPE)),
    );

    let outcome = run_blocking(&coordinator(&mock), &request(&fixture));

    let err = outcome.result.as_ref().unwrap_err();
    assert_eq!(err.stage, Stage::Detection);
    assert_eq!(err.kind(), ErrorKind::InvariantViolation);
    assert_eq!(failed_at(&outcome), Some(Stage::Detection));
    assert_eq!(mock.grade_calls(), 0);
    assert!(!fixture.report.exists());
}

#[tokio::test]
async fn test_grade_count_mismatch_fails_grading() {
    let fixture = ScanFixture::complete();
    let grades: Vec<Grade> = ["L1-L2", "L2-L3", "L3-L4"]
        .iter()
        .map(|d| Grade::healthy(d.parse().unwrap()))
        .collect();
    let mock = Arc::new(
        MockInference::new()
            .with_detections(lumbar_detections())
            .with_grades(grades),
    );

    let outcome = coordinator(&mock).execute(&request(&fixture)).await;

    let err = outcome.result.as_ref().unwrap_err();
    assert_eq!(err.stage, Stage::Grading);
    assert_eq!(err.kind(), ErrorKind::InvariantViolation);
    assert_eq!(failed_at(&outcome), Some(Stage::Grading));
    assert!(!fixture.report.exists());
}

#[tokio::test]
async fn test_grading_failure_ends_in_failed_state() {
    let fixture = ScanFixture::complete();
    let mock = Arc::new(
        MockInference::new()
            .with_detections(lumbar_detections())
            .failing_grading(InferenceError::Api {
                status: 503,
                message: "model not loaded".to_string(),
            }),
    );

    let outcome = coordinator(&mock).execute(&request(&fixture)).await;

    assert_eq!(
        outcome.result.as_ref().unwrap_err().kind(),
        ErrorKind::InferenceError
    );
    assert_eq!(
        &outcome.states[..4],
        &[
            PipelineState::Init,
            PipelineState::VolumeReady,
            PipelineState::Detected,
            PipelineState::RegionsReady,
        ]
    );
    assert_eq!(failed_at(&outcome), Some(Stage::Grading));
    assert!(!fixture.report.exists());
}

/// Produces the usual regions but collapses the first crop to nothing
struct CollapsingExtractor;

impl DiscExtractor for CollapsingExtractor {
    fn name(&self) -> &str {
        "collapsing"
    }

    fn extract(
        &self,
        detections: &[VertebraDetection],
        volume: &Volume,
    ) -> Result<Vec<IvdRegion>, Violation> {
        let mut regions = BoundaryInterpolation::new().extract(detections, volume)?;
        if let Some(first) = regions.first_mut() {
            first.crop = VoxelBox::new([0, 10, 0], [0, 10, 0]);
            first.voxels = Array3::zeros((0, 0, 0));
        }
        Ok(regions)
    }
}

#[tokio::test]
async fn test_degenerate_crop_is_rejected_before_grading() {
    let fixture = ScanFixture::complete();
    let mock = Arc::new(MockInference::new().with_detections(lumbar_detections()));

    let err = coordinator(&mock)
        .with_extractor(Arc::new(CollapsingExtractor))
        .run(&request(&fixture))
        .await
        .unwrap_err();

    assert_eq!(err.stage, Stage::Grading);
    assert!(matches!(
        err.source,
        StageError::Inference(InferenceError::DegenerateCrop { ref disc, .. }) if disc == "L1-L2"
    ));
    assert_eq!(mock.grade_calls(), 0);
}

#[tokio::test]
async fn test_missing_scan_directory() {
    let fixture = ScanFixture::complete();
    let mock = Arc::new(MockInference::new());

    let err = coordinator(&mock)
        .run(&RunRequest::new(
            fixture.root.path().join("no-such-scan"),
            &fixture.report,
        ))
        .await
        .unwrap_err();

    assert!(matches!(err.source, StageError::Load(LoadError::PathNotFound(_))));
}

#[derive(Default)]
struct RecordingHandler {
    events: Mutex<Vec<String>>,
}

impl ProgressHandler for RecordingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        let entry = match event {
            ProgressEvent::Started { .. } => "started".to_string(),
            ProgressEvent::StageStarted { stage, .. } => format!("begin {}", stage),
            ProgressEvent::StageComplete { stage, .. } => format!("end {}", stage),
            ProgressEvent::Completed { discs, .. } => format!("completed {}", discs),
            ProgressEvent::Failed { stage, .. } => format!("failed {}", stage),
        };
        self.events.lock().unwrap().push(entry);
    }
}

#[tokio::test]
async fn test_progress_events_follow_stage_order() {
    let fixture = ScanFixture::complete();
    let mock = Arc::new(MockInference::new().with_detections(lumbar_detections()));
    let handler = Arc::new(RecordingHandler::default());

    coordinator(&mock)
        .with_progress(handler.clone())
        .run(&request(&fixture))
        .await
        .unwrap();

    let events = handler.events.lock().unwrap().clone();
    let mut expected = vec!["started".to_string()];
    for stage in Stage::ALL {
        expected.push(format!("begin {}", stage));
        expected.push(format!("end {}", stage));
    }
    expected.push("completed 4".to_string());
    assert_eq!(events, expected);
}

#[tokio::test]
async fn test_failed_run_reports_failure_event() {
    let fixture = ScanFixture::complete();
    let mock =
        Arc::new(MockInference::new().failing_detection(InferenceError::Timeout { seconds: 30 }));
    let handler = Arc::new(RecordingHandler::default());

    let _ = coordinator(&mock)
        .with_progress(handler.clone())
        .run(&request(&fixture))
        .await;

    let events = handler.events.lock().unwrap().clone();
    assert_eq!(events.last().map(String::as_str), Some("failed Detection"));
    assert!(!events.contains(&"end Detection".to_string()));
}
