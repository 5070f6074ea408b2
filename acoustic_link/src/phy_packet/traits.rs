/// PHY layers send/receive packets of type [`PhyPacket`], a chunk of bytes no longer than the frame capacity
pub type PhyPacket = Vec<u8>;

/// the sequence of PCM samples put at the begining of each [`PhyPacket`] in acoustic channel.
pub type FramePreamble = Vec<f32>;
/// the sequence of PCM samples used to encode bytes of a [`PhyPacket`] in acoustic channel.
pub type FramePayload = Vec<f32>;

/// types that can generate preamble sequence
pub trait PreambleGen {
  /// number of samples in the preamble sequence
  fn len(&self) -> usize;

  /// generate the preamble samples, should contain exactly [`PreambleGen::len`] samples.
  fn generate(&self) -> FramePreamble;
}

/// type traits for frame detector strategy
pub trait FrameDetector {
  /// Update the detector state when a new sample is received.  
  /// Once a preamble is located, return the samples that follow it
  /// (the detector may need a few samples of look-ahead to be sure).
  fn on_sample(&mut self, sample: f32) -> Option<FramePayload>;

  /// Forget the history, start detecting from scratch.
  fn reset(&mut self);
}
