use kanal::{AsyncReceiver, AsyncSender};
use parking_lot::Mutex;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Why a message could not be placed into the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SendRejection {
  /// The shutdown token was cancelled before or while waiting for a free slot.
  Cancelled,
  /// The queue was closed for new messages.
  Closed,
}

/// A bounded, multi-producer, multi-consumer FIFO queue.
///
/// Backed by a `kanal` bounded channel, so a full queue makes senders wait
/// (backpressure) and a capacity of zero gives a rendezvous handoff.
pub(crate) struct TaskQueue<M> {
  tx: AsyncSender<M>,
  rx: AsyncReceiver<M>,
}

impl<M> TaskQueue<M> {
  /// Creates a new `TaskQueue` with a specified capacity.
  pub(crate) fn new(capacity: usize) -> Self {
    let (tx, rx) = kanal::bounded_async(capacity);
    Self { tx, rx }
  }

  /// Splits the queue into its producer and consumer halves.
  pub(crate) fn split(self) -> (QueueProducer<M>, QueueConsumer<M>) {
    (
      QueueProducer {
        tx: Mutex::new(Some(self.tx)),
      },
      QueueConsumer { rx: self.rx },
    )
  }
}

/// The producer half of the `TaskQueue`.
///
/// It owns the only long-lived sender. Closing drops that sender, so consumers
/// still drain everything already queued before they observe the end.
pub(crate) struct QueueProducer<M> {
  tx: Mutex<Option<AsyncSender<M>>>,
}

/// The consumer half of the `TaskQueue`. Cloning it adds another consumer
/// competing for the same messages.
pub(crate) struct QueueConsumer<M> {
  rx: AsyncReceiver<M>,
}

impl<M> Clone for QueueConsumer<M> {
  fn clone(&self) -> Self {
    Self { rx: self.rx.clone() }
  }
}

impl<M> fmt::Debug for QueueProducer<M> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("QueueProducer")
      .field("closed", &self.is_closed())
      .finish_non_exhaustive()
  }
}

impl<M> fmt::Debug for QueueConsumer<M> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("QueueConsumer")
      .field("len", &self.len())
      .finish_non_exhaustive()
  }
}

impl<M> QueueProducer<M> {
  /// Sends a message into the queue.
  ///
  /// Waits while the queue is full. The wait is abandoned, and the message
  /// dropped, as soon as `shutdown_token` is cancelled.
  pub(crate) async fn send(&self, message: M, shutdown_token: &CancellationToken) -> Result<(), SendRejection> {
    if shutdown_token.is_cancelled() {
      return Err(SendRejection::Cancelled);
    }

    // Clone the sender out so the lock is not held across the await.
    let Some(tx) = self.tx.lock().clone() else {
      return Err(SendRejection::Closed);
    };

    tokio::select! {
      biased;
      _ = shutdown_token.cancelled() => Err(SendRejection::Cancelled),
      sent = tx.send(message) => sent.map_err(|_| SendRejection::Closed),
    }
  }

  /// Closes the queue for new messages. Returns `true` only for the call that
  /// actually closed it.
  pub(crate) fn close(&self) -> bool {
    self.tx.lock().take().is_some()
  }

  /// Returns `true` if the queue has been closed for new messages.
  pub(crate) fn is_closed(&self) -> bool {
    self.tx.lock().is_none()
  }
}

impl<M> QueueConsumer<M> {
  /// Receives the next message. Returns `None` once the queue is closed and
  /// every queued message has been handed out.
  pub(crate) async fn recv(&self) -> Option<M> {
    self.rx.recv().await.ok()
  }

  /// Returns the number of messages waiting in the queue.
  pub(crate) fn len(&self) -> usize {
    self.rx.len()
  }

  /// Removes and drops every message currently waiting, without waiting for
  /// more. Returns how many were dropped.
  pub(crate) fn discard_pending(&self) -> usize {
    let mut discarded = 0;
    while let Ok(Some(_)) = self.rx.try_recv() {
      discarded += 1;
    }
    discarded
  }
}
