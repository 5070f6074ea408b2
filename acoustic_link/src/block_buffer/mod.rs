mod buffer;
mod concurrent_buffer;

pub use buffer::Buffer;
pub use concurrent_buffer::ConcurrentBuffer;

use crate::traits::{InStream, OutStream};
use std::convert::Infallible;

impl<T: Clone> InStream<T, Infallible> for Buffer<T> {
  fn read(&mut self, buf: &mut [T]) -> Result<usize, Infallible> {
    Ok(self.pop_slice(buf))
  }
}
impl<T: Clone> OutStream<T, Infallible> for Buffer<T> {
  fn write(&mut self, buf: &[T]) -> Result<(), Infallible> {
    self.push_slice(buf);
    Ok(())
  }
}
