use super::CorrelationFraming;
use crate::{
  config::ModemConfig,
  helper::add_noise,
  phy_packet::{preambles::ChirpUpDown, FrameDetector, PreambleGen},
};

const PL_LEN: usize = 500;

fn preamble() -> Vec<f32> {
  ChirpUpDown::new(&ModemConfig::default()).generate()
}

fn detector() -> CorrelationFraming {
  CorrelationFraming::new(preamble(), ModemConfig::DETECT_THRESHOLD)
}

fn payload() -> Vec<f32> {
  (0..PL_LEN).map(|x| (x as f32 * 0.33).sin()).collect()
}

/// feed the samples, collect everything the detector reports
fn feed(detector: &mut CorrelationFraming, samples: &[f32]) -> Vec<FramePayloadAt> {
  samples
    .iter()
    .enumerate()
    .filter_map(|(i, &x)| detector.on_sample(x).map(|found| (i, found)))
    .collect()
}

type FramePayloadAt = (usize, Vec<f32>);

#[test]
fn corr_detect() {
  let mut detector = detector();
  let payload = payload();
  let mut recv: Vec<f32> = preamble().iter().map(|x| x * 0.8).collect();
  recv.extend(&payload);

  let found = feed(&mut detector, &recv);
  assert_eq!(found.len(), 1);
  let (at, samples) = &found[0];
  // reported after the look-ahead, starting right after the preamble
  assert_eq!(*at, preamble().len() + CorrelationFraming::PEAK_LOOKAHEAD - 1);
  assert_eq!(samples.as_slice(), &payload[..CorrelationFraming::PEAK_LOOKAHEAD]);

  // trash: no frame will be found
  assert!(feed(&mut detector, &payload).is_empty());
}

#[test]
fn corr_detect_multi() {
  const N: usize = 10;
  let mut detector = detector();
  let mut recv = Vec::new();
  for _ in 0..N {
    recv.extend(std::iter::repeat(0.0).take(200));
    recv.extend(preamble().iter().map(|x| x * 0.5));
    recv.extend(payload());
  }
  let found = feed(&mut detector, &recv);
  assert_eq!(found.len(), N);
  let period = 200 + preamble().len() + PL_LEN;
  found
    .iter()
    .enumerate()
    .for_each(|(k, (at, _))| assert_eq!(*at, k * period + 200 + preamble().len() + CorrelationFraming::PEAK_LOOKAHEAD - 1));
}

#[test]
fn corr_detect_noisy() {
  let mut detector = detector();
  let mut recv = vec![0.0; 1000];
  recv.extend(preamble());
  recv.extend(payload());
  add_noise(&mut recv, 0.3, &mut rand::thread_rng());
  assert_eq!(feed(&mut detector, &recv).len(), 1);
}

#[test]
fn corr_detect_none() {
  let mut detector = detector();
  // trash sequence
  let recv: Vec<_> = (0..200).map(|x| x as f32).collect();
  assert!(feed(&mut detector, &recv).is_empty());

  // more random stuff
  let recv: Vec<_> = (0..PL_LEN * 20).map(|x| (x as f32 * 0.33).sin()).collect();
  assert!(feed(&mut detector, &recv).is_empty());

  let mut noise = vec![0.0; 10000];
  add_noise(&mut noise, 1.0, &mut rand::thread_rng());
  assert!(feed(&mut detector, &noise).is_empty());
}

#[test]
fn reset_drops_pending_peak() {
  let preamble = preamble();
  let silence = [0.0; 100];

  let mut detector = detector();
  assert!(feed(&mut detector, &preamble).is_empty());
  assert_eq!(feed(&mut detector, &silence).len(), 1);

  assert!(feed(&mut detector, &preamble).is_empty());
  detector.reset();
  assert!(feed(&mut detector, &silence).is_empty());
}
