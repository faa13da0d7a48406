//! Error types for task execution and queue configuration.
//!
//! Two kinds of failure exist:
//!
//! - [`TaskError`] is the failure half of an [`Outcome`]. It travels through finish observers,
//!   output slots and group aggregation.
//! - [`ScheduleError`] reports recoverable misuse of the API (double submission, wiring a task
//!   that has already been submitted, ...). It is returned directly to the caller.
//!
//! Fatal misuse (finishing a task twice, executing it twice) is not represented here: those are
//! bugs in the engine itself and panic.

use thiserror::Error;

use crate::types::TaskId;

/// Success-with-value or failure-with-error, the uniform result of a task.
pub type Outcome<T> = Result<T, TaskError>;

/// Result type for queue and wiring operations
pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Why a task finished without a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TaskError {
    /// The task ran while its input slot was still unset, or the input did not validate.
    #[error("Task {task_id} received invalid input: {reason}")]
    InvalidInput { task_id: TaskId, reason: String },

    /// The payload itself reported a failure.
    #[error("{message}")]
    Failed { message: String },

    /// The task was cancelled before it could produce a value.
    #[error("Task {task_id} was cancelled{}", reason_suffix(.reason))]
    Cancelled {
        task_id: TaskId,
        reason: Option<String>,
    },

    /// The payload panicked. The panic was caught and converted, the queue keeps running.
    #[error(
        "Task {task_id} panicked during execution: {panic_message}\n\
         \n\
         A task panicked, indicating a bug. Its dependents are still released."
    )]
    Panicked {
        task_id: TaskId,
        panic_message: String,
    },

    /// A value was expected from `task_id` (for instance as a group output) but it produced none.
    #[error("Task {task_id} finished without producing an output")]
    MissingOutput { task_id: TaskId },

    /// Children of a group could not be scheduled.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

impl TaskError {
    /// Convenience constructor for payload failures.
    ///
    /// ```
    /// use procq::TaskError;
    ///
    /// let err = TaskError::failed("server returned 500");
    /// assert_eq!(err.to_string(), "server returned 500");
    /// ```
    pub fn failed(message: impl Into<String>) -> Self {
        TaskError::Failed {
            message: message.into(),
        }
    }

    /// Whether this error came from a cancellation request.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, TaskError::Cancelled { .. })
    }
}

/// Recoverable misuse of the queue or of task wiring.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ScheduleError {
    /// The task was already handed to a scheduler (this one or another).
    #[error("Task {task_id} has already been submitted")]
    AlreadySubmitted { task_id: TaskId },

    /// The task can no longer be reconfigured: it was submitted, started or finished.
    #[error("Task {task_id} is sealed: cannot {what} in its current state")]
    Sealed { task_id: TaskId, what: &'static str },

    /// A task was asked to depend on itself.
    #[error("Task {task_id} cannot depend on itself")]
    SelfDependency { task_id: TaskId },

    /// Cycle detection is enabled and this submission would close a dependency cycle.
    #[error(
        "Submitting task {task_id} closes a dependency cycle\n\
         \n\
         A cycle can never make progress; the queue would stall forever."
    )]
    CycleDetected { task_id: TaskId },
}

fn reason_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!(": {reason}"),
        None => String::new(),
    }
}
