use crate::helper::{dot_product, energy};
use rustfft::{num_complex::Complex32, FftPlanner};

/// A cross correlation kernel.
///
/// `correlate(signal, template)[i] = sum_j signal[i + j] * template[j]`,
/// only the fully overlapping lags are returned,
/// so the output has `signal.len() - template.len() + 1` values (none if the template is longer).
pub trait Correlator: Send + Sync {
  fn correlate(&self, signal: &[f32], template: &[f32]) -> Vec<f32>;
}

/// Sliding dot product, `O(N*M)`. Good for short signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectCorrelator;

impl Correlator for DirectCorrelator {
  fn correlate(&self, signal: &[f32], template: &[f32]) -> Vec<f32> {
    if template.is_empty() || signal.len() < template.len() {
      return Vec::new();
    }
    signal
      .windows(template.len())
      .map(|window| dot_product(window.iter(), template.iter()))
      .collect()
  }
}

/// Correlation with FFT, `O((N+M) log(N+M))`.
/// The FFT planner is created per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct FftCorrelator;

impl Correlator for FftCorrelator {
  fn correlate(&self, signal: &[f32], template: &[f32]) -> Vec<f32> {
    if template.is_empty() || signal.len() < template.len() {
      return Vec::new();
    }
    // no circular wrap-around into the valid lags when n >= N + M - 1
    let n = (signal.len() + template.len() - 1).next_power_of_two();
    let to_complex = |seq: &[f32]| {
      let mut buf: Vec<Complex32> = seq.iter().map(|&x| Complex32::new(x, 0.0)).collect();
      buf.resize(n, Complex32::new(0.0, 0.0));
      buf
    };
    let mut planner = FftPlanner::<f32>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(n);

    let mut sig = to_complex(signal);
    let mut tpl = to_complex(template);
    forward.process(&mut sig);
    forward.process(&mut tpl);
    // IFFT(S * conj(T))[k] = sum_m s[m + k] * t[m]
    sig.iter_mut().zip(tpl.iter()).for_each(|(s, t)| *s *= t.conj());
    inverse.process(&mut sig);

    let scale = 1.0 / n as f32;
    sig[..=signal.len() - template.len()].iter().map(|c| c.re * scale).collect()
  }
}

/// Find the best match of `template` inside `signal` by normalized correlation
/// (cosine similarity between the template and each window of the signal).
/// Return the start index of the best window and its score in `[-1, 1]`,
/// [`None`] if the signal is shorter than the template.
pub fn locate(correlator: &dyn Correlator, signal: &[f32], template: &[f32]) -> Option<(usize, f32)> {
  let corr = correlator.correlate(signal, template);
  if corr.is_empty() {
    return None;
  }
  let tpl_energy = energy(template.iter());
  if tpl_energy <= 0.0 {
    return None;
  }
  let floor = tpl_energy * 1e-6;

  // prefix sums of squares give the energy of every window
  let mut prefix = Vec::with_capacity(signal.len() + 1);
  prefix.push(0.0_f64);
  signal.iter().for_each(|&x| {
    let last = *prefix.last().unwrap_or(&0.0);
    prefix.push(last + (x as f64) * (x as f64));
  });
  let m = template.len();

  corr
    .iter()
    .enumerate()
    .map(|(i, &c)| {
      let win_energy = (prefix[i + m] - prefix[i]).max(0.0) as f32;
      let score = if win_energy > floor {
        c / (win_energy * tpl_energy).sqrt()
      } else {
        0.0
      };
      (i, score)
    })
    .fold(None, |best: Option<(usize, f32)>, (i, score)| match best {
      Some((_, s)) if s >= score => best,
      _ => Some((i, score)),
    })
}

#[cfg(test)]
mod tests {
  use super::{locate, Correlator, DirectCorrelator, FftCorrelator};
  use crate::helper::chirp;
  use rand::{distributions::Uniform, Rng};

  #[test]
  fn fft_matches_direct() {
    let mut rng = rand::thread_rng();
    for _ in 0..20 {
      let n = rng.gen_range(10..500);
      let m = rng.gen_range(1..=n);
      let signal: Vec<f32> = (&mut rng).sample_iter(Uniform::new(-1.0, 1.0)).take(n).collect();
      let template: Vec<f32> = (&mut rng).sample_iter(Uniform::new(-1.0, 1.0)).take(m).collect();
      let direct = DirectCorrelator.correlate(&signal, &template);
      let fft = FftCorrelator.correlate(&signal, &template);
      assert_eq!(direct.len(), n - m + 1);
      assert_eq!(direct.len(), fft.len());
      direct
        .iter()
        .zip(fft.iter())
        .for_each(|(a, b)| assert!((a - b).abs() < 1e-2, "{a} != {b}"));
    }
  }

  #[test]
  fn template_longer_than_signal() {
    assert!(FftCorrelator.correlate(&[1.0; 3], &[1.0; 4]).is_empty());
    assert!(DirectCorrelator.correlate(&[1.0; 3], &[]).is_empty());
    assert_eq!(locate(&FftCorrelator, &[1.0; 3], &[1.0; 4]), None);
  }

  #[test]
  fn locate_embedded_chirp() {
    let template: Vec<f32> = chirp(3000.0, 6000.0, 440, 48000).collect();
    for offset in [0, 1, 17, 1000] {
      let mut signal = vec![0.0; offset];
      signal.extend(template.iter().map(|x| 0.5 * x));
      signal.extend(std::iter::repeat(0.0).take(300));
      let (idx, score) = locate(&FftCorrelator, &signal, &template).unwrap();
      assert_eq!(idx, offset);
      assert!(score > 0.99);
    }
  }

  #[test]
  fn silence_has_no_match() {
    let template: Vec<f32> = chirp(3000.0, 6000.0, 440, 48000).collect();
    let (_, score) = locate(&DirectCorrelator, &[0.0; 1000], &template).unwrap();
    assert_eq!(score, 0.0);
  }
}
