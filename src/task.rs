use crate::cancel::CancelToken;
use crate::error::TaskError;

/// Task identifiers run `1..=n` within one fan-out round.
pub type TaskId = usize;

/// Everything a worker hands to the task function: which task it is running
/// and the round's cancellation token.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub id: TaskId,
    cancel: CancelToken,
}

impl TaskContext {
    pub(crate) fn new(id: TaskId, cancel: CancelToken) -> Self {
        Self { id, cancel }
    }

    /// True once the collector has given up waiting on this round. Long
    /// tasks should poll this and return early.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// The single delivery made for one task: its value, or why it failed.
///
/// Exactly one `Outcome` is produced per launched task, by exactly one
/// worker; ownership moves to the collector on delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success { id: TaskId, value: T },
    Failure { id: TaskId, error: TaskError },
}

impl<T> Outcome<T> {
    /// The originating task's identifier.
    pub fn id(&self) -> TaskId {
        match self {
            Outcome::Success { id, .. } | Outcome::Failure { id, .. } => *id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Success { value, .. } => Some(value),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&TaskError> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failure { error, .. } => Some(error),
        }
    }
}

/// Collector lifecycle. `Done` is terminal, reached either by full
/// collection or by timeout expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Launching,
    Collecting,
    Done,
}
