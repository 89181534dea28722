use std::time::Duration;
use tracing::info;
use worker_pool::{CancellationToken, WorkerPool};

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();
  info!("--- Immediate Stop Example ---");

  let pool = WorkerPool::<u64, String, String>::new(&CancellationToken::new(), 10)
    .with_workers(2)
    .with_name("immediate_stop_pool");

  pool
    .start(|token, id| async move {
      info!("Task {} starting (up to 5s), watching for cancellation.", id);
      tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(5)) => Ok(format!("Task {} completed normally", id)),
        _ = token.cancelled() => Err(format!("Task {} interrupted by stop", id)),
      }
    })
    .expect("Failed to start pool");

  for id in 0..5 {
    if !pool.submit(id).await {
      tracing::error!("Task {} was rejected by the pool", id);
    }
  }

  let results = pool.get_results();
  let consumer = tokio::spawn(async move {
    while let Some(result) = results.recv().await {
      info!("Result: {:?}", result);
    }
  });

  tokio::time::sleep(Duration::from_millis(200)).await;
  info!(
    "Stopping now. Queue size: {}, Active: {}",
    pool.queued_task_count(),
    pool.active_task_count()
  );
  pool.stop().await;

  info!("Submit after stop accepted: {}", pool.submit(100).await);
  consumer.await.expect("Result consumer panicked");
  info!("--- Immediate Stop Example End ---");
}
