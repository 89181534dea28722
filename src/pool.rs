use crate::error::PoolError;
use crate::handle::TaskHandle;
use crate::results::{result_channel, ResultSink, ResultStream};
use crate::task::ManagedTaskInternal;
use crate::task_queue::{QueueConsumer, QueueProducer, TaskQueue};
use crate::worker::{run_worker_loop, WorkerContext};

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use tokio::runtime::Handle as TokioHandle;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};

lazy_static::lazy_static! {
  static ref NEXT_POOL_TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(0);
}

const DEFAULT_POOL_NAME: &str = "worker_pool";

/// A bounded pool of workers executing typed tasks.
///
/// Tasks of type `T` go into a bounded queue shared by all workers. Each
/// worker runs the task function given to [`WorkerPool::start`] and publishes
/// a `Result<R, PoolError<E>>` to a bounded result stream shared by all
/// consumers of [`WorkerPool::get_results`].
///
/// The pool terminates through exactly one of [`WorkerPool::stop`] (cancel now,
/// abandon queued work) or [`WorkerPool::graceful_stop`] (drain the queue, then
/// stop).
pub struct WorkerPool<T, R, E> {
  pool_name: Arc<String>,
  worker_count: usize,
  runtime: Option<TokioHandle>,
  task_queue_tx: QueueProducer<ManagedTaskInternal<T, R, E>>,
  task_queue_rx: QueueConsumer<ManagedTaskInternal<T, R, E>>,
  result_sink: ResultSink<R, E>,
  results: ResultStream<R, E>,
  shutdown_token: CancellationToken,
  started: AtomicBool,
  active_tasks: Arc<AtomicUsize>,
  worker_tracker: TaskTracker,
}

impl<T, R, E> WorkerPool<T, R, E>
where
  T: Send + 'static,
  R: Send + 'static,
  E: Send + 'static,
{
  /// Creates a pool whose task queue and result stream both hold up to
  /// `buffer_size` entries. A size of 0 makes every handoff synchronous.
  ///
  /// The pool's lifecycle token is a child of `parent`: cancelling `parent`
  /// also cancels the pool. The worker count defaults to the number of
  /// logical CPUs.
  pub fn new(parent: &CancellationToken, buffer_size: usize) -> Self {
    let (task_queue_tx, task_queue_rx) = TaskQueue::new(buffer_size).split();
    let (result_sink, results) = result_channel(buffer_size);
    let worker_count = num_cpus::get().max(1);

    debug!(pool_name = DEFAULT_POOL_NAME, buffer_size, worker_count, "Worker pool created.");

    Self {
      pool_name: Arc::new(DEFAULT_POOL_NAME.to_string()),
      worker_count,
      runtime: None,
      task_queue_tx,
      task_queue_rx,
      result_sink,
      results,
      shutdown_token: parent.child_token(),
      started: AtomicBool::new(false),
      active_tasks: Arc::new(AtomicUsize::new(0)),
      worker_tracker: TaskTracker::new(),
    }
  }

  /// Sets the number of workers. Values of 0 are ignored, as is any call made
  /// after [`WorkerPool::start`].
  pub fn with_workers(mut self, n: usize) -> Self {
    if self.started.load(AtomicOrdering::SeqCst) {
      warn!(pool_name = %self.pool_name, requested = n, "with_workers called after start; ignored.");
    } else if n > 0 {
      self.worker_count = n;
    }
    self
  }

  /// Sets the name attached to this pool's log events.
  pub fn with_name(mut self, name: &str) -> Self {
    self.pool_name = Arc::new(name.to_string());
    self
  }

  /// Spawns workers on `handle` instead of the runtime current at `start`.
  pub fn with_runtime(mut self, handle: TokioHandle) -> Self {
    self.runtime = Some(handle);
    self
  }

  pub fn name(&self) -> &str {
    &self.pool_name
  }

  pub fn worker_count(&self) -> usize {
    self.worker_count
  }

  /// Returns `true` once the pool's lifecycle has been cancelled, directly,
  /// through a parent token, or by a shutdown.
  pub fn is_cancelled(&self) -> bool {
    self.shutdown_token.is_cancelled()
  }

  /// A clone of the token governing this pool's lifecycle.
  pub fn cancellation_token(&self) -> CancellationToken {
    self.shutdown_token.clone()
  }

  /// Number of tasks currently executing inside the task function.
  pub fn active_task_count(&self) -> usize {
    self.active_tasks.load(AtomicOrdering::SeqCst)
  }

  /// Returns the current number of tasks in the pending queue.
  pub fn queued_task_count(&self) -> usize {
    self.task_queue_rx.len()
  }

  /// Spawns `worker_count` workers, each running `task_fn` on dequeued tasks.
  ///
  /// The task function receives the pool's cancellation token and should
  /// observe it for long-running work. A panic inside it is captured and
  /// reported as `PoolError::TaskPanicked` for that task only.
  ///
  /// # Errors
  /// Returns `PoolError::AlreadyStarted` on a second call,
  /// `PoolError::NoRuntime` when no Tokio runtime is reachable, and
  /// `PoolError::Cancelled` if the pool has already been stopped.
  pub fn start<F, Fut>(&self, task_fn: F) -> Result<(), PoolError<E>>
  where
    F: Fn(CancellationToken, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
  {
    let runtime = match &self.runtime {
      Some(handle) => handle.clone(),
      None => TokioHandle::try_current().map_err(|_| {
        error!(pool_name = %self.pool_name, "Start: no Tokio runtime available.");
        PoolError::NoRuntime
      })?,
    };

    if self.started.swap(true, AtomicOrdering::SeqCst) {
      warn!(pool_name = %self.pool_name, "Start: pool already started.");
      return Err(PoolError::AlreadyStarted);
    }

    let Some(result_tx) = self.result_sink.publisher() else {
      warn!(pool_name = %self.pool_name, "Start: pool already stopped.");
      return Err(PoolError::Cancelled);
    };

    let task_fn = Arc::new(task_fn);

    for worker_id in 0..self.worker_count {
      let ctx = WorkerContext {
        pool_name: self.pool_name.clone(),
        worker_id,
        task_queue_rx: self.task_queue_rx.clone(),
        result_tx: result_tx.clone(),
        task_fn: task_fn.clone(),
        shutdown_token: self.shutdown_token.clone(),
        active_tasks: self.active_tasks.clone(),
      };

      self.worker_tracker.spawn_on(
        run_worker_loop(ctx).instrument(info_span!("worker_pool_worker", pool_name = %self.pool_name, worker_id)),
        &runtime,
      );
    }

    info!(pool_name = %self.pool_name, worker_count = self.worker_count, "Worker pool started.");
    Ok(())
  }

  /// Enqueues a task, waiting while the queue is full.
  ///
  /// Returns `true` if the task was accepted. Returns `false`, dropping the
  /// task, if the pool is cancelled (before or during the wait) or its queue
  /// was closed by [`WorkerPool::graceful_stop`].
  #[must_use = "a task that was not accepted has been dropped"]
  pub async fn submit(&self, task: T) -> bool {
    self.enqueue(task, None).await.is_some()
  }

  /// Submits a task, then waits for a result to appear on the shared result
  /// stream.
  ///
  /// # Concurrency hazard
  /// The returned result is simply the next one on the shared stream; it is
  /// not correlated with `task`. Only call this when no other submission is
  /// in flight and nothing else drains [`WorkerPool::get_results`], otherwise
  /// a caller can receive another task's result. Use
  /// [`WorkerPool::submit_tracked`] when results must be correlated.
  ///
  /// # Errors
  /// Returns the task's error (`TaskFailed` / `TaskPanicked`),
  /// `PoolError::Cancelled` if the pool is or becomes cancelled, or
  /// `PoolError::ResultStreamClosed` if the stream closes first.
  pub async fn submit_wait(&self, task: T) -> Result<R, PoolError<E>> {
    if self.shutdown_token.is_cancelled() {
      return Err(PoolError::Cancelled);
    }

    if !self.submit(task).await {
      return Err(PoolError::Cancelled);
    }

    tokio::select! {
      biased;
      _ = self.shutdown_token.cancelled() => Err(PoolError::Cancelled),
      next = self.results.recv() => match next {
        Some(task_result) => task_result,
        None => Err(PoolError::ResultStreamClosed),
      }
    }
  }

  /// Submits a task whose result is delivered only to the returned handle,
  /// never to the shared result stream.
  ///
  /// # Errors
  /// Returns `PoolError::Cancelled` if the task could not be enqueued.
  pub async fn submit_tracked(&self, task: T) -> Result<TaskHandle<R, E>, PoolError<E>> {
    let (result_tx, result_rx) = oneshot::channel();
    match self.enqueue(task, Some(result_tx)).await {
      Some(task_id) => Ok(TaskHandle {
        task_id,
        result_receiver: result_rx,
      }),
      None => Err(PoolError::Cancelled),
    }
  }

  /// Returns a read handle on the shared result stream.
  ///
  /// Consumers should drain it continuously: once it is full, workers wait
  /// before publishing and task throughput stalls.
  pub fn get_results(&self) -> ResultStream<R, E> {
    self.results.clone()
  }

  /// Immediate shutdown.
  ///
  /// Cancels the pool, waits for workers to finish the task they are
  /// executing, discards queued tasks, then closes the result stream. The
  /// task queue itself is not closed; every later `submit` returns `false`.
  pub async fn stop(&self) {
    info!(pool_name = %self.pool_name, "Initiating immediate stop.");
    self.shutdown_token.cancel();

    self.await_workers().await;

    let discarded = self.task_queue_rx.discard_pending();
    if discarded > 0 {
      info!(pool_name = %self.pool_name, discarded, "Queued tasks abandoned by immediate stop.");
    }

    self.close_results();
    info!(pool_name = %self.pool_name, "Pool stopped.");
  }

  /// Graceful shutdown.
  ///
  /// Closes the task queue, waits for workers to execute everything already
  /// queued, then cancels the pool and closes the result stream. Every task
  /// accepted before the queue closed produces exactly one result.
  pub async fn graceful_stop(&self) {
    if self.task_queue_tx.close() {
      info!(pool_name = %self.pool_name, "Task queue closed. Draining remaining tasks.");
    } else {
      trace!(pool_name = %self.pool_name, "Task queue already closed.");
    }

    self.await_workers().await;
    self.shutdown_token.cancel();

    // Non-empty only if workers were never started or left early on cancellation.
    let discarded = self.task_queue_rx.discard_pending();
    if discarded > 0 {
      warn!(pool_name = %self.pool_name, discarded, "Queued tasks left without a worker at graceful stop.");
    }

    self.close_results();
    info!(pool_name = %self.pool_name, "Pool gracefully stopped.");
  }

  async fn enqueue(
    &self,
    task: T,
    reply: Option<oneshot::Sender<Result<R, PoolError<E>>>>,
  ) -> Option<u64> {
    let task_id = NEXT_POOL_TASK_ID_COUNTER.fetch_add(1, AtomicOrdering::Relaxed);
    let managed_task_internal = ManagedTaskInternal {
      task_id,
      payload: task,
      reply,
    };

    match self.task_queue_tx.send(managed_task_internal, &self.shutdown_token).await {
      Ok(()) => {
        trace!(pool_name = %self.pool_name, %task_id, "Task enqueued.");
        Some(task_id)
      }
      Err(rejection) => {
        debug!(pool_name = %self.pool_name, %task_id, ?rejection, "Submit: task rejected.");
        None
      }
    }
  }

  // Any number of concurrent shutdown calls may wait here; each returns only
  // once every worker has exited.
  async fn await_workers(&self) {
    self.worker_tracker.close();
    if self.worker_tracker.is_empty() {
      trace!(pool_name = %self.pool_name, "No workers to join.");
      return;
    }

    info!(pool_name = %self.pool_name, workers = self.worker_tracker.len(), "Waiting for workers to join.");
    self.worker_tracker.wait().await;
  }

  fn close_results(&self) {
    if self.result_sink.close() {
      debug!(pool_name = %self.pool_name, "Result stream closed.");
    } else {
      trace!(pool_name = %self.pool_name, "Result stream already closed.");
    }
  }
}

impl<T, R, E> fmt::Debug for WorkerPool<T, R, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WorkerPool")
      .field("pool_name", &self.pool_name)
      .field("worker_count", &self.worker_count)
      .field("started", &self.started.load(AtomicOrdering::SeqCst))
      .field("cancelled", &self.shutdown_token.is_cancelled())
      .field("task_queue", &self.task_queue_tx)
      .field("active_tasks", &self.active_tasks.load(AtomicOrdering::SeqCst))
      .finish_non_exhaustive()
  }
}

impl<T, R, E> Drop for WorkerPool<T, R, E> {
  fn drop(&mut self) {
    // Workers are not joined here; cancelling lets them exit on their own.
    if !self.shutdown_token.is_cancelled() {
      info!(
        pool_name = %*self.pool_name,
        "WorkerPool dropped without a shutdown. Cancelling so workers terminate."
      );
      self.shutdown_token.cancel();
    } else {
      trace!(pool_name = %*self.pool_name, "Drop: pool already cancelled.");
    }
  }
}
