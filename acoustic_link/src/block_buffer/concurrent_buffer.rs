use super::Buffer;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::{sync::Arc, time::Duration};

struct Shared<T> {
  buffer: Mutex<Buffer<T>>,
  not_empty: Condvar,
}

/// Thread-safe wrapper of [`Buffer`].  
/// Implemented with shared memory with mutex lock ([`Arc`] of [`Mutex`]).
/// Clones refer to the same buffer.
pub struct ConcurrentBuffer<T>(Arc<Shared<T>>);

impl<T> ConcurrentBuffer<T> {
  pub fn new() -> Self {
    Self(Arc::new(Shared {
      buffer: Mutex::new(Buffer::new()),
      not_empty: Condvar::new(),
    }))
  }

  /// lock the buffer for direct access
  pub fn lock(&self) -> MutexGuard<'_, Buffer<T>> {
    self.0.buffer.lock()
  }

  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }

  /// append a block and wake up a waiting reader
  pub fn push(&self, block: Vec<T>) {
    self.lock().push(block);
    self.0.not_empty.notify_all();
  }
}

impl<T: Clone> ConcurrentBuffer<T> {
  /// append a chunk of data, with slice
  pub fn push_slice(&self, src: &[T]) {
    self.lock().push_slice(src);
    self.0.not_empty.notify_all();
  }

  /// fetch data to fill the slice without waiting
  pub fn pop_slice(&self, dest: &mut [T]) -> usize {
    self.lock().pop_slice(dest)
  }

  /// fetch data to fill the slice, wait at most `timeout` if the buffer is empty
  pub fn pop_slice_timeout(&self, dest: &mut [T], timeout: Duration) -> usize {
    let mut guard = self.lock();
    if guard.is_empty() {
      let _ = self.0.not_empty.wait_for(&mut guard, timeout);
    }
    guard.pop_slice(dest)
  }
}

impl<T> Clone for ConcurrentBuffer<T> {
  fn clone(&self) -> Self {
    Self(self.0.clone())
  }
}

impl<T> Default for ConcurrentBuffer<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> std::fmt::Debug for ConcurrentBuffer<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ConcurrentBuffer").field("len", &self.len()).finish()
  }
}
