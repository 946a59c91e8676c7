use std::sync::{Mutex, MutexGuard};

/// Acquire a lock on a mutex, disregarding whether it was poisoned.
///
/// Every write behind these locks is a single map operation, so poisoned data is still whole.
pub trait Open<T> {
  /// Acquire the lock
  fn open(&self) -> MutexGuard<'_, T>;
}

impl<T> Open<T> for Mutex<T> {
  fn open(&self) -> MutexGuard<'_, T> {
    self.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}
