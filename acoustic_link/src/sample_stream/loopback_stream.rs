use crate::{
  block_buffer::ConcurrentBuffer,
  error::ChannelError,
  traits::{DuplexStream, InStream, OutStream},
};

use super::READ_WAIT;

/// A loopback stream.
/// The stream can read out whatever written into it, clones share the same buffer.
#[derive(Clone, Debug, Default)]
pub struct LoopBackStream(ConcurrentBuffer<f32>);

impl LoopBackStream {
  pub fn new() -> Self {
    Self(ConcurrentBuffer::new())
  }

  /// number of samples written but not read yet
  pub fn pending(&self) -> usize {
    self.0.len()
  }
}

impl InStream<f32, ChannelError> for LoopBackStream {
  fn read(&mut self, buf: &mut [f32]) -> Result<usize, ChannelError> {
    Ok(self.0.pop_slice_timeout(buf, READ_WAIT))
  }
}

impl OutStream<f32, ChannelError> for LoopBackStream {
  fn write(&mut self, buf: &[f32]) -> Result<(), ChannelError> {
    self.0.push_slice(buf);
    Ok(())
  }
}

impl DuplexStream<f32, ChannelError> for LoopBackStream {
  type Source = LoopBackStream;
  type Sink = LoopBackStream;

  fn split(self) -> (Self::Source, Self::Sink) {
    (self.clone(), self)
  }
}
