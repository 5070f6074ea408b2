use crate::error::ModemError;
use hound::WavSpec;

/// Size of the MAC header carried at the front of every frame.
/// The modem itself does not look into it, it only bounds the frame capacity.
pub const MIN_FRAME_BYTES: usize = 3;
/// The PHY packet length field is one byte.
pub const MAX_FRAME_BYTES: usize = 255;

/// Parameters of one DPSK modem instance, fixed for its lifetime.
///
/// - `sample_rate`: samples per second of the audio stream
/// - `carrier_freq`: frequency of the carrier wave in Hz
/// - `samples_per_symbol`: number of samples used to encode one bit
/// - `frame_bytes`: capacity of one frame in bytes
/// - `chirp_low`, `chirp_high`, `chirp_len`: the up/down chirp preamble
/// - `detect_threshold`: minimal normalized correlation to accept a preamble
/// - `guard_samples`: silence written after each frame on a stream
#[derive(Debug, Clone, PartialEq)]
pub struct ModemConfig {
  pub sample_rate: u32,
  pub carrier_freq: f32,
  pub samples_per_symbol: usize,
  pub frame_bytes: usize,
  pub chirp_low: f32,
  pub chirp_high: f32,
  pub chirp_len: usize,
  pub detect_threshold: f32,
  pub guard_samples: usize,
}

impl ModemConfig {
  pub const CHANNELS: u16 = 1;
  pub const SAMPLE_RATE: u32 = 48000;
  pub const BUFFER_SIZE: usize = 1024;
  pub const BITS_PER_SAMPLE: u16 = 32;
  pub const CARRIER_FREQ: f32 = 4800.0;
  pub const SAMPLES_PER_SYMBOL: usize = 20;
  pub const FRAME_BYTES: usize = 125;
  pub const CHIRP_LOW: f32 = 3000.0;
  pub const CHIRP_HIGH: f32 = 6000.0;
  pub const CHIRP_LEN: usize = 440;
  pub const DETECT_THRESHOLD: f32 = 0.6;
  pub const GUARD_SAMPLES: usize = 480;

  /// The default configuration with a different frame capacity.
  pub fn with_frame_bytes(frame_bytes: usize) -> Self {
    Self {
      frame_bytes,
      ..Self::default()
    }
  }

  /// Number of carrier cycles in one symbol, not necessarily integral.
  pub fn cycles_per_symbol(&self) -> f32 {
    self.carrier_freq * self.samples_per_symbol as f32 / self.sample_rate as f32
  }

  /// Number of bits transmitted per second.
  pub fn bit_rate(&self) -> f32 {
    self.sample_rate as f32 / self.samples_per_symbol as f32
  }

  /// Check that the parameters can be used by a modem.
  pub fn validate(&self) -> Result<(), ModemError> {
    let invalid = |msg: String| Err(ModemError::InvalidConfig(msg));
    if self.sample_rate == 0 || self.samples_per_symbol == 0 {
      return invalid("sample rate and samples per symbol must be positive".into());
    }
    let nyquist = self.sample_rate as f32 / 2.0;
    if !(self.carrier_freq > 0.0 && self.carrier_freq < nyquist) {
      return invalid(format!("carrier {} Hz is out of (0, {nyquist}) Hz", self.carrier_freq));
    }
    if self.chirp_low <= 0.0 || self.chirp_high >= nyquist || self.chirp_low >= self.chirp_high {
      return invalid(format!(
        "chirp band {}..{} Hz is out of (0, {nyquist}) Hz",
        self.chirp_low, self.chirp_high
      ));
    }
    // an integral number of cycles keeps the symbol phase stable at every boundary
    let cycles = self.cycles_per_symbol();
    if (cycles - cycles.round()).abs() > 1e-4 || cycles.round() < 1.0 {
      return invalid(format!("{cycles} carrier cycles per symbol is not a positive integer"));
    }
    if self.chirp_len < 2 {
      return invalid("chirp preamble is too short".into());
    }
    if !(MIN_FRAME_BYTES..=MAX_FRAME_BYTES).contains(&self.frame_bytes) {
      return invalid(format!(
        "frame capacity {} is out of {MIN_FRAME_BYTES}..={MAX_FRAME_BYTES}",
        self.frame_bytes
      ));
    }
    if !(self.detect_threshold > 0.0 && self.detect_threshold < 1.0) {
      return invalid(format!("detection threshold {} is out of (0, 1)", self.detect_threshold));
    }
    Ok(())
  }
}

impl Default for ModemConfig {
  fn default() -> Self {
    Self {
      sample_rate: Self::SAMPLE_RATE,
      carrier_freq: Self::CARRIER_FREQ,
      samples_per_symbol: Self::SAMPLES_PER_SYMBOL,
      frame_bytes: Self::FRAME_BYTES,
      chirp_low: Self::CHIRP_LOW,
      chirp_high: Self::CHIRP_HIGH,
      chirp_len: Self::CHIRP_LEN,
      detect_threshold: Self::DETECT_THRESHOLD,
      guard_samples: Self::GUARD_SAMPLES,
    }
  }
}

impl From<&ModemConfig> for WavSpec {
  fn from(config: &ModemConfig) -> Self {
    WavSpec {
      channels: ModemConfig::CHANNELS,
      sample_rate: config.sample_rate,
      bits_per_sample: ModemConfig::BITS_PER_SAMPLE,
      sample_format: hound::SampleFormat::Float,
    }
  }
}

#[cfg(feature = "audio")]
impl From<&ModemConfig> for cpal::StreamConfig {
  fn from(config: &ModemConfig) -> Self {
    cpal::StreamConfig {
      channels: ModemConfig::CHANNELS,
      sample_rate: cpal::SampleRate(config.sample_rate),
      buffer_size: cpal::BufferSize::Fixed(ModemConfig::BUFFER_SIZE as u32),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::ModemConfig;
  use crate::error::ModemError;

  #[test]
  fn default_is_valid() {
    let config = ModemConfig::default();
    assert_eq!(config.validate(), Ok(()));
    assert_eq!(config.cycles_per_symbol(), 2.0);
    assert_eq!(config.bit_rate(), 2400.0);
  }

  #[test]
  fn fractional_cycles_rejected() {
    let config = ModemConfig {
      carrier_freq: 5000.0,
      ..Default::default()
    };
    assert!(matches!(config.validate(), Err(ModemError::InvalidConfig(_))));
  }

  #[test]
  fn carrier_above_nyquist_rejected() {
    let config = ModemConfig {
      carrier_freq: 24000.0,
      samples_per_symbol: 2,
      ..Default::default()
    };
    assert!(config.validate().is_err());
  }

  #[test]
  fn frame_capacity_bounds() {
    assert!(ModemConfig::with_frame_bytes(2).validate().is_err());
    assert!(ModemConfig::with_frame_bytes(3).validate().is_ok());
    assert!(ModemConfig::with_frame_bytes(255).validate().is_ok());
    assert!(ModemConfig::with_frame_bytes(256).validate().is_err());
  }
}
