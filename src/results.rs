use crate::task::TaskResult;

use futures::stream::{self, Stream};
use kanal::{AsyncReceiver, AsyncSender};
use parking_lot::Mutex;
use std::fmt;

/// Creates the bounded result channel shared by all workers of a pool.
pub(crate) fn result_channel<R, E>(capacity: usize) -> (ResultSink<R, E>, ResultStream<R, E>) {
  let (tx, rx) = kanal::bounded_async(capacity);
  (ResultSink { tx: Mutex::new(Some(tx)) }, ResultStream { rx })
}

/// The pool-owned write side of the result stream.
///
/// Workers publish through clones handed out by `publisher`; the stream ends
/// for consumers once the sink is closed and every worker clone is gone.
pub(crate) struct ResultSink<R, E> {
  tx: Mutex<Option<AsyncSender<TaskResult<R, E>>>>,
}

impl<R, E> ResultSink<R, E> {
  /// Returns a sender for one worker, or `None` if the sink is already closed.
  pub(crate) fn publisher(&self) -> Option<AsyncSender<TaskResult<R, E>>> {
    self.tx.lock().clone()
  }

  /// Closes the sink. Returns `true` only for the call that actually closed it.
  pub(crate) fn close(&self) -> bool {
    self.tx.lock().take().is_some()
  }
}

impl<R, E> fmt::Debug for ResultSink<R, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ResultSink")
      .field("closed", &self.tx.lock().is_none())
      .finish()
  }
}

/// Read handle on a pool's shared result stream.
///
/// Every clone competes for the same results: each result is delivered to
/// exactly one reader. Results arrive in completion order, not submission order.
pub struct ResultStream<R, E> {
  rx: AsyncReceiver<TaskResult<R, E>>,
}

impl<R, E> Clone for ResultStream<R, E> {
  fn clone(&self) -> Self {
    Self { rx: self.rx.clone() }
  }
}

impl<R, E> fmt::Debug for ResultStream<R, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ResultStream")
      .field("buffered", &self.rx.len())
      .finish()
  }
}

impl<R, E> ResultStream<R, E> {
  /// Waits for the next result.
  ///
  /// Returns `None` once the pool has been stopped and all buffered results
  /// have been read.
  pub async fn recv(&self) -> Option<TaskResult<R, E>> {
    self.rx.recv().await.ok()
  }

  /// Number of results currently buffered and not yet read.
  pub fn len(&self) -> usize {
    self.rx.len()
  }

  /// Returns `true` if no results are currently buffered.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Adapts this handle into a `futures::Stream` that ends when the result
  /// stream is closed and drained.
  pub fn into_stream(self) -> impl Stream<Item = TaskResult<R, E>> {
    stream::unfold(self, |results| async move {
      let next = results.recv().await?;
      Some((next, results))
    })
  }
}
