use super::state::{Stage, TransitionError};
use crate::inference::InferenceError;
use crate::report::SinkError;
use crate::source::LoadError;
use crate::validation::Violation;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Broad failure category, as surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    LoadError,
    InferenceError,
    InvariantViolation,
    SinkError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::LoadError => "LoadError",
            ErrorKind::InferenceError => "InferenceError",
            ErrorKind::InvariantViolation => "InvariantViolation",
            ErrorKind::SinkError => "SinkError",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Invariant(#[from] Violation),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl From<TransitionError> for StageError {
    fn from(err: TransitionError) -> Self {
        StageError::Invariant(Violation::new("StateTransition", err.to_string()))
    }
}

/// A failed run: the stage it failed in and what went wrong
#[derive(Debug, Error)]
#[error("{stage} stage failed ({}): {source}", source_kind(.source))]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: StageError,
}

fn source_kind(source: &StageError) -> ErrorKind {
    match source {
        StageError::Load(_) => ErrorKind::LoadError,
        StageError::Inference(_) => ErrorKind::InferenceError,
        StageError::Invariant(_) => ErrorKind::InvariantViolation,
        StageError::Sink(_) => ErrorKind::SinkError,
    }
}

impl PipelineError {
    pub fn new(stage: Stage, source: impl Into<StageError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn kind(&self) -> ErrorKind {
        source_kind(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::state::PipelineState;
    use std::path::PathBuf;

    #[test]
    fn test_kind_and_message() {
        let err = PipelineError::new(Stage::Load, LoadError::PathNotFound(PathBuf::from("/nope")));
        assert_eq!(err.kind(), ErrorKind::LoadError);
        assert_eq!(err.stage(), Stage::Load);
        assert_eq!(
            err.to_string(),
            "Load stage failed (LoadError): scan path not found: /nope"
        );
    }

    #[test]
    fn test_transition_error_is_invariant_violation() {
        let err = PipelineError::new(
            Stage::Grading,
            TransitionError {
                from: PipelineState::Init,
                to: PipelineState::Done,
            },
        );
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);
        assert!(err.to_string().contains("StateTransition"));
    }
}
