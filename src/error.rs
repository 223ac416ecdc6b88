use thiserror::Error;

/// Why a single task failed.
///
/// Carried inside [`Outcome::Failure`](crate::task::Outcome); one task's
/// failure never aborts the surrounding fan-out round.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The task function returned an error.
    #[error("task failed: {0}")]
    Failed(String),

    /// The task function panicked. The panic is caught inside the worker
    /// thread and delivered through the same channel as success values.
    #[error("task panicked: {0}")]
    Panicked(String),
}
