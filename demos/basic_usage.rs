use std::time::Duration;
use tracing::info;
use worker_pool::{CancellationToken, WorkerPool};

async fn word_length(id: usize, word: String) -> Result<(usize, usize), String> {
  let delay_ms = 100 + (id as u64 % 3 * 150);
  info!("Task {} measuring {:?}, will sleep for {}ms", id, word, delay_ms);
  tokio::time::sleep(Duration::from_millis(delay_ms)).await;
  if word.is_empty() {
    return Err(format!("task {} got an empty word", id));
  }
  Ok((id, word.chars().count()))
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false) // Disable module paths for cleaner example output
    .init();

  info!("--- Basic Usage Example ---");

  let root = CancellationToken::new();
  let pool = WorkerPool::<(usize, String), (usize, usize), String>::new(&root, 10)
    .with_workers(2)
    .with_name("basic_pool");

  pool
    .start(|_token, (id, word)| word_length(id, word))
    .expect("Failed to start pool");

  let words = ["tokio", "worker", "", "pool", "stream"];
  let results = pool.get_results();
  let consumer = tokio::spawn(async move {
    while let Some(result) = results.recv().await {
      match result {
        Ok((id, len)) => info!("Task {} -> {} chars", id, len),
        Err(e) => info!("Task error: {}", e),
      }
    }
    info!("Result stream closed.");
  });

  for (id, word) in words.iter().enumerate() {
    if !pool.submit((id, word.to_string())).await {
      tracing::error!("Failed to submit task {}", id);
    }
  }

  info!("All tasks submitted. Draining pool.");
  pool.graceful_stop().await;
  consumer.await.expect("Result consumer panicked");
  info!("--- Basic Usage Example End ---");
}
