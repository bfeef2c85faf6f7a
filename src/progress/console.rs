//! Terminal progress bar

use super::{ProgressEvent, ProgressHandler};
use crate::pipeline::Stage;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Renders run progress as a bar on stderr, one step per stage
pub struct ConsoleHandler {
    bar: ProgressBar,
}

impl ConsoleHandler {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// A handler that tracks progress without drawing anything
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(Some(Stage::TOTAL as u64), target);
        let style = ProgressStyle::with_template("{spinner:.cyan} [{pos}/{len}] {msg} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        Self { bar }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn message(&self) -> String {
        self.bar.message()
    }
}

impl Default for ConsoleHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressHandler for ConsoleHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { scan_dir } => {
                self.bar.set_position(0);
                self.bar.set_message(format!("Starting {}", scan_dir));
                self.bar.enable_steady_tick(Duration::from_millis(120));
            }
            ProgressEvent::StageStarted { stage, index, .. } => {
                self.bar.set_position(*index as u64 - 1);
                self.bar.set_message(stage.name());
            }
            ProgressEvent::StageComplete { index, .. } => {
                self.bar.set_position(*index as u64);
            }
            ProgressEvent::Completed { discs, .. } => {
                self.bar
                    .finish_with_message(format!("Done: {} disc(s) graded", discs));
            }
            ProgressEvent::Failed { stage, error } => {
                self.bar
                    .abandon_with_message(format!("{} failed: {}", stage, error));
            }
        }
    }
}
