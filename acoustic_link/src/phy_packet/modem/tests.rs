use rand::{distributions::Standard, Rng};

use super::DpskModem;
use crate::{
  config::ModemConfig,
  error::ModemError,
  helper::add_noise,
  phy_packet::correlation::DirectCorrelator,
  sample_stream::{HoundInStream, HoundOutStream},
  traits::{InStream, OutStream},
};

const MODEM_TESTS: usize = 50;

fn random_bytes(len: usize) -> Vec<u8> {
  rand::thread_rng().sample_iter(Standard).take(len).collect()
}

/// encode/decode identity in ideal transmission channel
#[test]
fn dpsk_ideal() {
  let modem = DpskModem::new(ModemConfig::default()).unwrap();
  let mut rng = rand::thread_rng();
  for _ in 0..MODEM_TESTS {
    let bytes = random_bytes(rng.gen_range(0..=ModemConfig::FRAME_BYTES));
    let samples = modem.modulate(&bytes).unwrap();
    assert_eq!(samples.len(), modem.samples_for(bytes.len()));
    assert_eq!(modem.demodulate(&samples).unwrap(), bytes);
  }
}

/// encode/decode identity in noisy channel, where the noise is distributed as Uniform(-0.5,+0.5).
#[test]
fn dpsk_noise() {
  let modem = DpskModem::new(ModemConfig::default()).unwrap();
  let mut rng = rand::thread_rng();
  for _ in 0..MODEM_TESTS {
    let bytes = random_bytes(ModemConfig::FRAME_BYTES);
    let mut samples = modem.modulate(&bytes).unwrap();
    add_noise(&mut samples, 0.5, &mut rng);
    assert_eq!(modem.demodulate(&samples).unwrap(), bytes);
  }
}

#[test]
fn empty_payload() {
  let modem = DpskModem::new(ModemConfig::default()).unwrap();
  let samples = modem.modulate(&[]).unwrap();
  assert_eq!(samples.len(), modem.preamble_len());
  assert_eq!(modem.demodulate(&samples), Ok(vec![]));
}

#[test]
fn payload_too_large() {
  let modem = DpskModem::new(ModemConfig::with_frame_bytes(10)).unwrap();
  assert_eq!(
    modem.modulate(&[0; 11]),
    Err(ModemError::PayloadTooLarge { len: 11, max: 10 })
  );
  assert!(modem.modulate(&[0; 10]).is_ok());
}

#[test]
fn invalid_config() {
  let config = ModemConfig {
    samples_per_symbol: 15,
    ..Default::default()
  };
  assert!(matches!(DpskModem::new(config), Err(ModemError::InvalidConfig(_))));
}

#[test]
fn no_preamble() {
  let modem = DpskModem::new(ModemConfig::default()).unwrap();
  assert_eq!(modem.demodulate(&[0.0; 4000]), Err(ModemError::PreambleNotFound));
  assert_eq!(modem.demodulate(&[0.0; 10]), Err(ModemError::PreambleNotFound));

  let mut noise = vec![0.0; 4000];
  add_noise(&mut noise, 0.5, &mut rand::thread_rng());
  assert_eq!(modem.demodulate(&noise), Err(ModemError::PreambleNotFound));
}

/// the frame is found anywhere in the buffer, trailing silence is not decoded
#[test]
fn surrounded_by_silence() {
  let modem = DpskModem::new(ModemConfig::default()).unwrap();
  let mut rng = rand::thread_rng();
  for _ in 0..MODEM_TESTS {
    let bytes = random_bytes(rng.gen_range(1..=40));
    let mut samples = vec![0.0; rng.gen_range(0..2000)];
    samples.extend(modem.modulate(&bytes).unwrap());
    samples.extend(std::iter::repeat(0.0).take(rng.gen_range(0..2000)));
    assert_eq!(modem.demodulate(&samples).unwrap(), bytes);
  }
}

#[test]
fn direct_correlator() {
  let modem = DpskModem::with_correlator(ModemConfig::with_frame_bytes(16), Box::new(DirectCorrelator)).unwrap();
  let bytes = random_bytes(16);
  let mut samples = vec![0.0; 123];
  samples.extend(modem.modulate(&bytes).unwrap());
  assert_eq!(modem.demodulate(&samples).unwrap(), bytes);
}

/// other parameters with an integral number of cycles per symbol
#[test]
fn other_carrier() {
  let config = ModemConfig {
    carrier_freq: 2400.0,
    samples_per_symbol: 40,
    ..Default::default()
  };
  let modem = DpskModem::new(config).unwrap();
  let bytes = random_bytes(ModemConfig::FRAME_BYTES);
  assert_eq!(modem.demodulate(&modem.modulate(&bytes).unwrap()).unwrap(), bytes);
}

/// write a frame to a WAV file and decode it from the file
#[test]
fn through_wav_file() {
  let config = ModemConfig::default();
  let modem = DpskModem::new(config.clone()).unwrap();
  let bytes = random_bytes(64);
  let path = std::env::temp_dir().join(format!("dpsk_modem_{}.wav", std::process::id()));

  let mut out_stream = HoundOutStream::create(&path, &config).unwrap();
  out_stream.write(&[0.0; 300]).unwrap();
  out_stream.write(&modem.modulate(&bytes).unwrap()).unwrap();
  out_stream.finalize().unwrap();

  let mut in_stream = HoundInStream::open(&path).unwrap();
  let mut samples = vec![0.0; in_stream.remaining()];
  let n = in_stream.read(&mut samples).unwrap();
  assert_eq!(n, samples.len());
  assert_eq!(in_stream.read(&mut [0.0; 16]).unwrap(), 0);
  std::fs::remove_file(&path).unwrap();

  assert_eq!(modem.demodulate(&samples).unwrap(), bytes);
}
