pub mod coordinator;
pub mod error;
pub mod extraction;
pub mod stages;
pub mod state;

pub use coordinator::{PipelineCoordinator, RunOutcome, RunRequest, RunSummary};
pub use error::{ErrorKind, PipelineError, StageError};
pub use extraction::{BoundaryInterpolation, DiscExtractor};
pub use state::{PipelineState, Stage, StateMachine, TransitionError};
