use crate::error::PoolError;

use std::any::Any;

use tokio::sync::oneshot;

/// The outcome of executing one task: the task's value, or the error it
/// produced (`PoolError::TaskFailed` / `PoolError::TaskPanicked`).
pub type TaskResult<R, E> = Result<R, PoolError<E>>;

/// Internal representation of a task sitting in the pool's queue.
pub(crate) struct ManagedTaskInternal<T, R, E> {
  pub(crate) task_id: u64,
  pub(crate) payload: T,
  /// Present only for tracked submissions; untracked results go to the shared stream.
  pub(crate) reply: Option<oneshot::Sender<TaskResult<R, E>>>,
}

/// Renders a panic payload caught by `catch_unwind` as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&'static str>() {
    (*s).to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "non-string panic payload".to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_panic_message_from_str_and_string() {
    let str_payload = std::panic::catch_unwind(|| panic!("static message")).unwrap_err();
    assert_eq!(panic_message(str_payload.as_ref()), "static message");

    let value = 7;
    let string_payload = std::panic::catch_unwind(|| panic!("formatted {}", value)).unwrap_err();
    assert_eq!(panic_message(string_payload.as_ref()), "formatted 7");
  }

  #[test]
  fn test_panic_message_from_other_payload() {
    let payload = std::panic::catch_unwind(|| std::panic::panic_any(42u32)).unwrap_err();
    assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
  }
}
