//! Progress handler trait and events

use crate::pipeline::Stage;
use std::time::Duration;

/// Events emitted while a pipeline run progresses
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Run started
    Started { scan_dir: String },

    /// A stage began
    StageStarted {
        stage: Stage,
        index: usize,
        total: usize,
    },

    /// A stage finished and its output passed validation
    StageComplete {
        stage: Stage,
        index: usize,
        total: usize,
        duration: Duration,
    },

    /// Report persisted
    Completed { discs: usize, total_time: Duration },

    /// Run failed
    Failed { stage: Stage, error: String },
}

impl ProgressEvent {
    pub fn stage_started(stage: Stage) -> Self {
        ProgressEvent::StageStarted {
            stage,
            index: stage.index(),
            total: Stage::TOTAL,
        }
    }

    pub fn stage_complete(stage: Stage, duration: Duration) -> Self {
        ProgressEvent::StageComplete {
            stage,
            index: stage.index(),
            total: Stage::TOTAL,
            duration,
        }
    }
}

/// Trait for handling progress events during a run
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {
        // Intentionally empty
    }
}
