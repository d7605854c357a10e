//! Error taxonomy for scheduler runs.

use thiserror::Error;

/// One entry in the unordered error slice a run returns.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The command callback returned an error while executing this task.
    /// Unwrap to recover the original error.
    #[error("task '{task}' failed")]
    Failed {
        task: String,
        #[source]
        source: anyhow::Error,
    },

    /// The run was cancelled by the caller before this task could finish.
    #[error("task '{task}' cancelled")]
    Cancelled {
        task: String,
        #[source]
        source: anyhow::Error,
    },

    /// The task set contained more than one task with the same id.
    #[error("duplicate tasks found: {ids:?}")]
    Duplicate { ids: Vec<String> },
}

impl TaskError {
    /// The id of the task this error is attributed to, when there is one.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::Failed { task, .. } | Self::Cancelled { task, .. } => Some(task),
            Self::Duplicate { .. } => None,
        }
    }
}
