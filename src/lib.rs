//! bakery - builds book-production CI pipelines and runs single stages locally

pub mod cli;
pub mod core;
pub mod execution;
pub mod pipelines;
pub mod tasks;

// Re-export commonly used types
pub use crate::core::{ImageCoordinates, ImageSelection, PipelineEnvironment, PipelinePlan, TaskDescriptor};
pub use crate::execution::{LocalOrchestrator, LocalStage, OrchestratorConfig, OrchestratorError, ProcessSupervisor};
pub use crate::pipelines::PipelineKind;
pub use crate::tasks::{TaskArgs, TaskKind};
