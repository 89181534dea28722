use std::time::Duration;
use tracing::info;
use worker_pool::{CancellationToken, PoolError, WorkerPool};

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();
  info!("--- Task Panic Example ---");

  let pool = WorkerPool::<bool, String, String>::new(&CancellationToken::new(), 5)
    .with_workers(1)
    .with_name("panic_pool");

  pool
    .start(|_token, should_panic| async move {
      tokio::time::sleep(Duration::from_millis(100)).await;
      if should_panic {
        info!("Panicking Task: About to panic!");
        panic!("This task is designed to panic!");
      }
      Ok("Healthy task finished".to_string())
    })
    .expect("Failed to start pool");

  match pool.submit_wait(true).await {
    Ok(result) => info!("Task completed with UNEXPECTED result: {}", result),
    Err(PoolError::TaskPanicked(message)) => info!("Task correctly reported a panic: {}", message),
    Err(e) => info!("Task resulted in unexpected error: {:?}", e),
  }

  // The same single worker keeps serving tasks.
  match pool.submit_wait(false).await {
    Ok(result) => info!("Follow-up task: {}", result),
    Err(e) => info!("Follow-up task failed unexpectedly: {:?}", e),
  }

  info!("Shutting down pool.");
  pool.graceful_stop().await;
  info!("--- Task Panic Example End ---");
}
