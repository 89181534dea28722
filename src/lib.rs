//! A Tokio-based bounded worker pool: typed tasks go into a shared bounded
//! queue, a fixed number of workers execute them with panic isolation, and
//! typed results come out of a shared bounded stream. Shutdown is either
//! graceful (drain the queue) or immediate (cancel now).

mod error;
mod handle;
mod pool;
mod results;
mod task;
mod task_queue;
mod worker;

pub use error::PoolError;
pub use handle::TaskHandle;
pub use pool::WorkerPool;
pub use results::ResultStream;
pub use task::TaskResult;
pub use tokio_util::sync::CancellationToken;
