//! Run lifecycle: stages and the state machine the coordinator walks through

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A unit of work in a pipeline run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Load,
    Detection,
    Extraction,
    Grading,
    Report,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Load,
        Stage::Detection,
        Stage::Extraction,
        Stage::Grading,
        Stage::Report,
    ];

    pub const TOTAL: usize = Self::ALL.len();

    pub fn name(self) -> &'static str {
        match self {
            Stage::Load => "Load",
            Stage::Detection => "Detection",
            Stage::Extraction => "Extraction",
            Stage::Grading => "Grading",
            Stage::Report => "Report",
        }
    }

    /// 1-based position, as shown in progress output
    pub fn index(self) -> usize {
        match self {
            Stage::Load => 1,
            Stage::Detection => 2,
            Stage::Extraction => 3,
            Stage::Grading => 4,
            Stage::Report => 5,
        }
    }

    /// State reached when this stage's output has been validated
    pub fn completed_state(self) -> PipelineState {
        match self {
            Stage::Load => PipelineState::VolumeReady,
            Stage::Detection => PipelineState::Detected,
            Stage::Extraction => PipelineState::RegionsReady,
            Stage::Grading => PipelineState::Graded,
            Stage::Report => PipelineState::Reported,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    Init,
    VolumeReady,
    Detected,
    RegionsReady,
    Graded,
    Reported,
    Done,
    Failed { stage: Stage, reason: String },
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed { .. })
    }

    fn successor(&self) -> Option<PipelineState> {
        match self {
            PipelineState::Init => Some(PipelineState::VolumeReady),
            PipelineState::VolumeReady => Some(PipelineState::Detected),
            PipelineState::Detected => Some(PipelineState::RegionsReady),
            PipelineState::RegionsReady => Some(PipelineState::Graded),
            PipelineState::Graded => Some(PipelineState::Reported),
            PipelineState::Reported => Some(PipelineState::Done),
            PipelineState::Done | PipelineState::Failed { .. } => None,
        }
    }

    /// Whether `next` may follow this state
    pub fn can_transition_to(&self, next: &PipelineState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            PipelineState::Failed { .. } => true,
            other => self.successor().as_ref() == Some(other),
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Init => write!(f, "Init"),
            PipelineState::VolumeReady => write!(f, "VolumeReady"),
            PipelineState::Detected => write!(f, "Detected"),
            PipelineState::RegionsReady => write!(f, "RegionsReady"),
            PipelineState::Graded => write!(f, "Graded"),
            PipelineState::Reported => write!(f, "Reported"),
            PipelineState::Done => write!(f, "Done"),
            PipelineState::Failed { stage, reason } => write!(f, "Failed({}: {})", stage, reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal transition from {from} to {to}")]
pub struct TransitionError {
    pub from: PipelineState,
    pub to: PipelineState,
}

/// Current state plus the history of every state visited in a run
#[derive(Debug, Clone)]
pub struct StateMachine {
    history: Vec<PipelineState>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            history: vec![PipelineState::Init],
        }
    }

    pub fn current(&self) -> &PipelineState {
        // history always starts with Init
        &self.history[self.history.len() - 1]
    }

    pub fn advance(&mut self, next: PipelineState) -> Result<(), TransitionError> {
        let current = self.current();
        if !current.can_transition_to(&next) {
            return Err(TransitionError {
                from: current.clone(),
                to: next,
            });
        }
        self.history.push(next);
        Ok(())
    }

    /// Moves to `Failed`. A run that already reached a terminal state is left untouched.
    pub fn fail(&mut self, stage: Stage, reason: impl Into<String>) -> bool {
        self.advance(PipelineState::Failed {
            stage,
            reason: reason.into(),
        })
        .is_ok()
    }

    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    pub fn into_history(self) -> Vec<PipelineState> {
        self.history
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
