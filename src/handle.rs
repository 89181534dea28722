use crate::error::PoolError;
use crate::task::TaskResult;

use tokio::sync::oneshot;

/// A handle to a task submitted with `WorkerPool::submit_tracked`.
///
/// The task's result is delivered to this handle only, so it cannot be
/// consumed by another caller draining the pool's shared result stream.
#[derive(Debug)]
pub struct TaskHandle<R, E> {
  pub(crate) task_id: u64,
  pub(crate) result_receiver: oneshot::Receiver<TaskResult<R, E>>,
}

impl<R, E> TaskHandle<R, E> {
  /// Returns the unique ID of this task.
  pub fn id(&self) -> u64 {
    self.task_id
  }

  /// Awaits the completion of the task and returns its result.
  ///
  /// # Errors
  /// Returns `PoolError::TaskFailed` if the task function returned an error.
  /// Returns `PoolError::TaskPanicked` if the task panicked during execution.
  /// Returns `PoolError::Abandoned` if the pool was stopped before the task ran,
  /// or before its result could be published.
  pub async fn await_result(self) -> Result<R, PoolError<E>> {
    match self.result_receiver.await {
      Ok(task_outcome) => task_outcome,
      Err(_) => {
        tracing::debug!(task_id = %self.task_id, "Tracked task dropped its reply channel without a result.");
        Err(PoolError::Abandoned)
      }
    }
  }
}
