use crate::helper::copy;
use std::collections::VecDeque;

/// A FIFO queue of elements, stored as a list of blocks.
/// Pushing a slice costs one allocation, popping copies elements out.
#[derive(Clone, Debug)]
pub struct Buffer<T> {
  blocks: VecDeque<Vec<T>>,
  len: usize,
}

impl<T> Buffer<T> {
  pub fn new() -> Self {
    Self {
      blocks: Default::default(),
      len: 0,
    }
  }
  /// append a chunk of data into the buffer
  pub fn push(&mut self, block: Vec<T>) {
    if !block.is_empty() {
      self.len += block.len();
      self.blocks.push_back(block);
    }
  }
  /// fetch a chunk of data from the buffer
  pub fn pop(&mut self) -> Option<Vec<T>> {
    let block = self.blocks.pop_front()?;
    self.len -= block.len();
    Some(block)
  }

  /// number of elements in the buffer
  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }
}

impl<T: Clone> Buffer<T> {
  /// append a chunk of data, with slice
  pub fn push_slice(&mut self, src: &[T]) {
    self.push(src.to_vec());
  }

  /// fetch a chunk of data to fill the slice.
  /// return the number of poped elements.
  pub fn pop_slice(&mut self, dest: &mut [T]) -> usize {
    let n = dest.len();

    let mut i = 0;
    while i < n {
      if let Some(mut block) = self.blocks.pop_front() {
        let m = std::cmp::min(n - i, block.len());
        copy(dest[i..].iter_mut(), block.drain(..m));
        i += m;
        if !block.is_empty() {
          self.blocks.push_front(block);
        }
      } else {
        break;
      }
    }

    self.len -= i;
    i
  }
}

impl<T> Default for Buffer<T> {
  fn default() -> Self {
    Self::new()
  }
}
