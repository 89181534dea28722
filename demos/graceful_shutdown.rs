use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use worker_pool::{CancellationToken, WorkerPool};

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();
  info!("--- Graceful Shutdown Example ---");

  let pool = Arc::new(
    WorkerPool::<u64, String, String>::new(&CancellationToken::new(), 10)
      .with_workers(2)
      .with_name("graceful_shutdown_pool"),
  );

  pool
    .start(|_token, id| async move {
      info!("Task {} starting (will run for 1s)", id);
      tokio::time::sleep(Duration::from_secs(1)).await;
      Ok(format!("Task {} finished after 1s", id))
    })
    .expect("Failed to start pool");

  // Submit 5 tasks. With 2 workers, tasks 0 and 1 start, 2..4 wait in the queue.
  for id in 0..5 {
    if !pool.submit(id).await {
      tracing::error!("Task {} was rejected by the pool", id);
    }
  }
  info!(
    "All 5 tasks submitted. Queue size: {}, Active: {}",
    pool.queued_task_count(),
    pool.active_task_count()
  );

  let results = pool.get_results();
  let consumer = tokio::spawn(async move {
    let mut received = 0;
    while let Some(result) = results.recv().await {
      received += 1;
      info!("Result: {:?}", result);
    }
    received
  });

  let pool_for_shutdown = pool.clone();
  let shutdown_jh = tokio::spawn(async move {
    info!("Calling graceful_stop()...");
    pool_for_shutdown.graceful_stop().await;
    info!("graceful_stop() returned.");
  });

  // The queue is closed as soon as the drain begins.
  tokio::time::sleep(Duration::from_millis(50)).await;
  info!("Attempting to submit task after shutdown initiated...");
  if pool.submit(99).await {
    tracing::error!("LATE SUBMISSION SUCCEEDED (UNEXPECTED!)");
  } else {
    info!("Late submission correctly rejected.");
  }

  shutdown_jh.await.expect("Shutdown join handle failed");
  let received = consumer.await.expect("Result consumer panicked");
  info!("Received {} results; every queued task ran.", received);
  info!("--- Graceful Shutdown Example End ---");
}
