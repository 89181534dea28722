use crate::error::PoolError;
use crate::task::{panic_message, ManagedTaskInternal, TaskResult};
use crate::task_queue::QueueConsumer;

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use futures::FutureExt;
use kanal::AsyncSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Everything one worker needs to run its loop.
pub(crate) struct WorkerContext<T, R, E, F> {
  pub(crate) pool_name: Arc<String>,
  pub(crate) worker_id: usize,
  pub(crate) task_queue_rx: QueueConsumer<ManagedTaskInternal<T, R, E>>,
  pub(crate) result_tx: AsyncSender<TaskResult<R, E>>,
  pub(crate) task_fn: Arc<F>,
  pub(crate) shutdown_token: CancellationToken,
  pub(crate) active_tasks: Arc<AtomicUsize>,
}

/// Runs one worker until the pool is cancelled or the task queue is closed
/// and drained.
pub(crate) async fn run_worker_loop<T, R, E, F, Fut>(ctx: WorkerContext<T, R, E, F>)
where
  F: Fn(CancellationToken, T) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<R, E>> + Send,
{
  let WorkerContext {
    pool_name,
    worker_id,
    task_queue_rx,
    result_tx,
    task_fn,
    shutdown_token,
    active_tasks,
  } = ctx;

  debug!(pool_name = %*pool_name, worker_id, "Worker started.");

  loop {
    let managed_task = tokio::select! {
      biased;

      _ = shutdown_token.cancelled() => {
        debug!(pool_name = %*pool_name, worker_id, "Shutdown signal received. Worker terminating.");
        break;
      }

      next = task_queue_rx.recv() => match next {
        Some(task) => task,
        None => {
          debug!(pool_name = %*pool_name, worker_id, "Task queue closed and drained. Worker terminating.");
          break;
        }
      }
    };

    let ManagedTaskInternal { task_id, payload, reply } = managed_task;
    trace!(pool_name = %*pool_name, worker_id, %task_id, "Dequeued task.");

    active_tasks.fetch_add(1, AtomicOrdering::SeqCst);
    let outcome = execute_task(task_fn.as_ref(), shutdown_token.clone(), payload).await;
    active_tasks.fetch_sub(1, AtomicOrdering::SeqCst);

    match &outcome {
      Ok(_) => trace!(pool_name = %*pool_name, worker_id, %task_id, "Task executed successfully."),
      Err(PoolError::TaskPanicked(message)) => {
        error!(pool_name = %*pool_name, worker_id, %task_id, panic = %message, "Task panicked during execution.")
      }
      Err(_) => debug!(pool_name = %*pool_name, worker_id, %task_id, "Task returned an error."),
    }

    if let Some(reply_tx) = reply {
      if reply_tx.send(outcome).is_err() {
        warn!(pool_name = %*pool_name, %task_id, "Handle for tracked task was dropped. Task outcome lost.");
      }
      continue;
    }

    // The send branch goes first so a result is still published when the
    // stream has room, even if the pool was cancelled meanwhile.
    let published = tokio::select! {
      biased;
      sent = result_tx.send(outcome) => {
        if sent.is_err() {
          warn!(pool_name = %*pool_name, %task_id, "Result stream has no readers left. Task outcome lost.");
        }
        true
      }
      _ = shutdown_token.cancelled() => false,
    };

    if !published {
      debug!(
        pool_name = %*pool_name,
        worker_id,
        %task_id,
        "Pool cancelled while result stream was full. Result dropped, worker terminating."
      );
      break;
    }
  }

  info!(pool_name = %*pool_name, worker_id, "Worker stopped.");
}

/// Invokes the task function, turning a panic into `PoolError::TaskPanicked`.
async fn execute_task<T, R, E, F, Fut>(task_fn: &F, token: CancellationToken, payload: T) -> TaskResult<R, E>
where
  F: Fn(CancellationToken, T) -> Fut,
  Fut: Future<Output = Result<R, E>>,
{
  // The call itself sits inside the async block so a panic raised before the
  // returned future is first polled is caught too.
  match AssertUnwindSafe(async { task_fn(token, payload).await }).catch_unwind().await {
    Ok(Ok(value)) => Ok(value),
    Ok(Err(task_error)) => Err(PoolError::TaskFailed(task_error)),
    Err(panic_payload) => Err(PoolError::TaskPanicked(panic_message(panic_payload.as_ref()))),
  }
}
