//! Engine error types.

use thiserror::Error;

use braid_core::{JobId, NodeId, StepError};
use braid_step::SimpackError;
use braid_tree::TreeError;

/// Errors detected by [`ProjectConfig::validate`](crate::ProjectConfig::validate).
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// Cruncher threads need a non-empty name prefix.
    #[error("cruncher thread name prefix is empty")]
    EmptyThreadName,
    /// A work queue capacity of zero would never let a cruncher step.
    #[error("work queue capacity must be at least 1")]
    WorkQueueZero,
    /// A zero poll interval would spin.
    #[error("backpressure poll interval must be at least 1 ms")]
    PollIntervalZero,
    /// The default clock buffer is NaN, infinite, or negative.
    #[error("default clock buffer must be finite and non-negative, got {value}")]
    InvalidClockBuffer {
        /// The rejected value.
        value: f64,
    },
}

/// Errors from [`Project`](crate::Project) and
/// [`CrunchingManager`](crate::CrunchingManager) operations.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// A tree operation failed.
    #[error(transparent)]
    Tree(#[from] TreeError),
    /// A synchronous step failed.
    #[error(transparent)]
    Step(#[from] StepError),
    /// The simpack could not be used.
    #[error(transparent)]
    Simpack(#[from] SimpackError),
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A step profile's history dependence differs from the simpack's.
    #[error(
        "step function '{step_function}' (history-dependent: {step_history_dependent}) does not match the simpack"
    )]
    HistoryDependenceMismatch {
        /// Name of the offending step function.
        step_function: String,
        /// Whether the step function reads a history.
        step_history_dependent: bool,
    },
    /// A cruncher thread could not be spawned.
    #[error("failed to spawn cruncher thread: {reason}")]
    ThreadSpawnFailed {
        /// The OS error.
        reason: String,
    },
    /// The node is an unfinished edit.
    #[error("node {node} is still in editing")]
    StillInEditing {
        /// The node being edited.
        node: NodeId,
    },
    /// The simpack has no step function by this name.
    #[error("no step function named '{name}'")]
    UnknownStepFunction {
        /// The requested name.
        name: String,
    },
    /// No active job has this id.
    #[error("no active job {job}")]
    UnknownJob {
        /// The requested job.
        job: JobId,
    },
}
