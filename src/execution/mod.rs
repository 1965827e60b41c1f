//! Local execution of single stages

pub mod compose;
pub mod orchestrator;
pub mod process;
pub mod readiness;
pub mod signal;
pub mod stage;

pub use orchestrator::{
    ErrorKind, EventHandler, ExecutionRequest, LocalOrchestrator, OrchestratorConfig, OrchestratorError,
    OrchestratorEvent, SessionState, StageOptions,
};
pub use process::{ChildRegistry, CommandRunner, CommandSpec, ExitHook, ProcessError, ProcessSupervisor};
pub use readiness::{Endpoint, HttpReadinessWaiter, ReadinessError, ReadinessProbe};
pub use stage::{LocalStage, PreparedStage, StageError, TaskSource};
