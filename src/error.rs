use thiserror::Error;

/// Errors produced by a `WorkerPool`.
///
/// `E` is the error type returned by the pool's task function. On the shared
/// result stream only `TaskFailed` and `TaskPanicked` ever appear; the other
/// variants are returned synchronously to callers.
#[derive(Error, Debug, PartialEq)]
pub enum PoolError<E> {
  #[error("Task failed: {0}")]
  TaskFailed(E),

  #[error("Task panicked during execution: {0}")]
  TaskPanicked(String),

  #[error("Pool is cancelled or shut down, task was not accepted")]
  Cancelled,

  #[error("Pool's result stream was closed before a result arrived")]
  ResultStreamClosed,

  #[error("Task was abandoned before its result could be delivered")]
  Abandoned,

  #[error("Pool has already been started")]
  AlreadyStarted,

  #[error("No Tokio runtime available to spawn pool workers on")]
  NoRuntime,
}

impl<E> PoolError<E> {
  /// Returns `true` for errors that were produced by executing a task
  /// (its own error or a recovered panic).
  pub fn is_task_error(&self) -> bool {
    matches!(self, PoolError::TaskFailed(_) | PoolError::TaskPanicked(_))
  }
}
