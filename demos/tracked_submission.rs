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
  info!("--- Tracked Submission Example ---");

  let pool = Arc::new(
    WorkerPool::<u64, u64, String>::new(&CancellationToken::new(), 8)
      .with_workers(3)
      .with_name("tracked_pool"),
  );

  pool
    .start(|_token, n| async move {
      tokio::time::sleep(Duration::from_millis(50 * (n % 4))).await;
      Ok(n * n)
    })
    .expect("Failed to start pool");

  // Concurrent callers each get their own answer back, unlike submit_wait.
  let mut callers = Vec::new();
  for n in 0..8 {
    let pool = pool.clone();
    callers.push(tokio::spawn(async move {
      match pool.submit_tracked(n).await {
        Ok(handle) => {
          let task_id = handle.id();
          info!("Caller {} submitted task {}", n, task_id);
          info!("Caller {} got {:?}", n, handle.await_result().await);
        }
        Err(e) => tracing::error!("Caller {} could not submit: {}", n, e),
      }
    }));
  }

  for caller in callers {
    caller.await.expect("Caller panicked");
  }

  pool.graceful_stop().await;
  info!("--- Tracked Submission Example End ---");
}
