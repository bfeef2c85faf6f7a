//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { scan_dir } => {
                info!(scan_dir = %scan_dir, "Starting pipeline run");
            }
            ProgressEvent::StageStarted {
                stage,
                index,
                total,
            } => {
                info!(
                    stage = %stage,
                    progress = format!("{}/{}", index, total),
                    "[{}/{}] {}",
                    index,
                    total,
                    stage
                );
            }
            ProgressEvent::StageComplete {
                stage,
                index,
                total,
                duration,
            } => {
                debug!(
                    stage = %stage,
                    progress = format!("{}/{}", index, total),
                    duration_ms = duration.as_millis(),
                    "Stage complete"
                );
            }
            ProgressEvent::Completed { discs, total_time } => {
                info!(
                    discs,
                    total_time_ms = total_time.as_millis(),
                    "Pipeline complete"
                );
            }
            ProgressEvent::Failed { stage, error } => {
                warn!(stage = %stage, error = %error, "Pipeline failed");
            }
        }
    }
}
