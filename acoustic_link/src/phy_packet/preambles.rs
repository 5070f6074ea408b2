use super::{FramePreamble, PreambleGen};
use crate::{config::ModemConfig, helper::chirp};

/// an chirp signal preamble sequence, the frequency goes up then down.
/// The first half sweeps `low -> high`, the second half `high -> low`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChirpUpDown {
  /// the lowest frequency
  pub low: f32,
  /// the highest frequency
  pub high: f32,
  /// number of samples
  pub len: usize,
  /// the sampling frequency
  pub sample_rate: u32,
}

impl ChirpUpDown {
  pub fn new(config: &ModemConfig) -> Self {
    Self {
      low: config.chirp_low,
      high: config.chirp_high,
      len: config.chirp_len,
      sample_rate: config.sample_rate,
    }
  }
}

impl PreambleGen for ChirpUpDown {
  fn len(&self) -> usize {
    self.len
  }

  fn generate(&self) -> FramePreamble {
    let up = self.len / 2;
    let down = self.len - up;
    chirp(self.low, self.high, up, self.sample_rate)
      .chain(chirp(self.high, self.low, down, self.sample_rate))
      .collect()
  }
}
