use std::f32::consts::TAU;

use rustfft::num_complex::Complex32;

use crate::{
  config::ModemConfig,
  error::ModemError,
  helper::{bits_to_bytes, bytes_to_bits},
  phy_packet::{
    correlation::{locate, Correlator, FftCorrelator},
    preambles::ChirpUpDown,
    FramePayload, PreambleGen,
  },
};

/// DPSK (differential phase shift keying)
/// - one bit per symbol
/// - fixed frequency carrier, an integral number of cycles per symbol
/// - bit 0 keeps the phase of the previous symbol, bit 1 shifts it by pi
/// - the preamble is a chirp followed by one unmodulated reference symbol
/// - bits are sent least significant bit first
///
/// The receiver correlates every symbol with the carrier and compares it
/// with the previous symbol, so no absolute phase reference is needed.
pub struct DpskModem {
  config: ModemConfig,
  chirp: Vec<f32>,
  /// one symbol of the carrier starting at phase zero
  carrier: Vec<f32>,
  /// `exp(-j * w * n)` for one symbol, used to measure a symbol's phase
  basis: Vec<Complex32>,
  correlator: Box<dyn Correlator>,
}

impl DpskModem {
  /// Create a modem with the FFT correlator for preamble search.
  pub fn new(config: ModemConfig) -> Result<Self, ModemError> {
    Self::with_correlator(config, Box::new(FftCorrelator))
  }

  /// Create a modem with a custom correlation kernel for preamble search.
  pub fn with_correlator(config: ModemConfig, correlator: Box<dyn Correlator>) -> Result<Self, ModemError> {
    config.validate()?;
    let chirp = ChirpUpDown::new(&config).generate();
    let w = TAU * config.carrier_freq / config.sample_rate as f32;
    let carrier = (0..config.samples_per_symbol)
      .map(|n| (w * n as f32).sin())
      .collect();
    let basis = (0..config.samples_per_symbol)
      .map(|n| Complex32::from_polar(1.0, -w * n as f32))
      .collect();
    Ok(Self {
      config,
      chirp,
      carrier,
      basis,
      correlator,
    })
  }

  pub fn config(&self) -> &ModemConfig {
    &self.config
  }

  /// the chirp part of the preamble
  pub fn chirp(&self) -> &[f32] {
    &self.chirp
  }

  pub fn samples_per_symbol(&self) -> usize {
    self.config.samples_per_symbol
  }

  /// number of samples of the preamble: the chirp and the reference symbol
  pub fn preamble_len(&self) -> usize {
    self.chirp.len() + self.config.samples_per_symbol
  }

  /// number of samples produced by [`DpskModem::modulate`] for `bytes` bytes
  pub fn samples_for(&self, bytes: usize) -> usize {
    self.preamble_len() + bytes * 8 * self.config.samples_per_symbol
  }

  /// Encode bytes into samples: preamble followed by one symbol per bit.
  /// `bytes` must hold no more than `frame_bytes` bytes.
  pub fn modulate(&self, bytes: &[u8]) -> Result<FramePayload, ModemError> {
    let max = self.config.frame_bytes;
    if bytes.len() > max {
      return Err(ModemError::PayloadTooLarge { len: bytes.len(), max });
    }
    Ok(self.render(bytes))
  }

  /// [`DpskModem::modulate`] without the capacity check.
  pub(crate) fn render(&self, bytes: &[u8]) -> FramePayload {
    let mut frame = FramePayload::with_capacity(self.samples_for(bytes.len()));
    frame.extend(&self.chirp);
    frame.extend(&self.carrier);

    let mut phase = 1.0;
    bytes_to_bits(bytes).into_iter().for_each(|bit| {
      if bit == 1 {
        phase = -phase;
      }
      frame.extend(self.carrier.iter().map(|x| phase * x));
    });
    frame
  }

  /// Decode bytes from samples.
  /// The preamble is located by correlation, every whole byte after it is decoded,
  /// up to `frame_bytes` bytes.
  pub fn demodulate(&self, samples: &[f32]) -> Result<Vec<u8>, ModemError> {
    match locate(self.correlator.as_ref(), samples, &self.chirp) {
      Some((start, score)) if score >= self.config.detect_threshold => {
        log::trace!("preamble at {start}, score {score:.3}");
        Ok(self.decode_symbols(&samples[start + self.chirp.len()..], self.config.frame_bytes))
      }
      _ => Err(ModemError::PreambleNotFound),
    }
  }

  /// Decode at most `max_bytes` bytes from the samples right after the chirp,
  /// the first symbol is the phase reference.
  /// The frame ends at the first symbol much weaker than the reference symbol.
  pub(crate) fn decode_symbols(&self, samples: &[f32], max_bytes: usize) -> Vec<u8> {
    let mut phasors = samples
      .chunks_exact(self.config.samples_per_symbol)
      .map(|symbol| self.symbol_phasor(symbol));
    let mut prev = match phasors.next() {
      Some(z) => z,
      None => return Vec::new(),
    };
    let floor = prev.norm() * Self::FADE_RATIO;

    let bits: Vec<u8> = phasors
      .take(max_bytes * 8)
      .take_while(|z| z.norm() >= floor)
      .map(|z| {
        // Re(z_k * conj(z_{k-1})) < 0 <=> the phase turned by more than pi/2
        let bit = ((z * prev.conj()).re < 0.0) as u8;
        prev = z;
        bit
      })
      .collect();
    bits_to_bytes(&bits)
  }

  /// symbols weaker than this fraction of the reference symbol are silence
  const FADE_RATIO: f32 = 0.25;

  /// correlate one symbol with the carrier, the argument of the result is the symbol phase
  fn symbol_phasor(&self, symbol: &[f32]) -> Complex32 {
    symbol
      .iter()
      .zip(self.basis.iter())
      .fold(Complex32::new(0.0, 0.0), |sum, (&x, b)| sum + b * x)
  }
}

impl std::fmt::Debug for DpskModem {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DpskModem").field("config", &self.config).finish()
  }
}
