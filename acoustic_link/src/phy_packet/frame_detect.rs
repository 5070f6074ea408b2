use std::collections::VecDeque;

use crate::helper::{dot_product, energy};

use super::{FrameDetector, FramePayload};

enum FramingState {
  /// slide the window until the similarity exceeds the threshold
  Detect,
  /// the similarity is high, follow it to the local maximum.
  /// `after` holds the samples received after the best window so far.
  Peak {
    best: f32,
    after: Vec<f32>,
  },
}

/// detecting frames with normalized correlation (Cosine-Similarity) against the preamble.
///
/// Once the similarity goes above `threshold`, keep sliding for
/// [`CorrelationFraming::PEAK_LOOKAHEAD`] samples after the best window,
/// then report the samples that follow the best window.
pub struct CorrelationFraming {
  state: FramingState,
  preamble: Vec<f32>,
  preamble_energy: f32,
  threshold: f32,
  window: VecDeque<f32>,
  /// running sum of squares of `window`
  window_energy: f32,
  /// samples since the last full recomputation of `window_energy`
  since_refresh: usize,
}

impl CorrelationFraming {
  /// samples to wait after the best correlation before accepting it
  pub const PEAK_LOOKAHEAD: usize = 32;

  pub fn new(preamble: Vec<f32>, threshold: f32) -> Self {
    let m = preamble.len();
    let preamble_energy = energy(preamble.iter());
    Self {
      state: FramingState::Detect,
      preamble,
      preamble_energy,
      threshold,
      window: std::iter::repeat(0.0).take(m).collect(),
      window_energy: 0.0,
      since_refresh: 0,
    }
  }

  /// slide the window by one sample, return the similarity of the new window and the preamble
  fn slide(&mut self, sample: f32) -> f32 {
    let old = self.window.pop_front().unwrap_or(0.0);
    self.window.push_back(sample);

    // the running sum drifts with rounding errors, recompute it once per window length
    self.since_refresh += 1;
    if self.since_refresh >= self.window.len() {
      self.window_energy = energy(self.window.iter());
      self.since_refresh = 0;
    } else {
      self.window_energy += sample * sample - old * old;
    }

    if self.window_energy <= self.preamble_energy * 1e-6 {
      return 0.0;
    }
    let dot = dot_product(self.window.iter(), self.preamble.iter());
    dot / (self.window_energy * self.preamble_energy).sqrt()
  }
}

impl FrameDetector for CorrelationFraming {
  fn on_sample(&mut self, sample: f32) -> Option<FramePayload> {
    let score = self.slide(sample);
    match &mut self.state {
      FramingState::Detect => {
        if score > self.threshold {
          self.state = FramingState::Peak {
            best: score,
            after: Vec::with_capacity(Self::PEAK_LOOKAHEAD),
          };
        }
        None
      }
      FramingState::Peak { best, after } => {
        if score > *best {
          *best = score;
          after.clear();
          return None;
        }
        after.push(sample);
        if after.len() < Self::PEAK_LOOKAHEAD {
          return None;
        }
        log::trace!("preamble found, similarity {best:.3}");
        let payload = std::mem::take(after);
        self.reset();
        Some(payload)
      }
    }
  }

  fn reset(&mut self) {
    self.state = FramingState::Detect;
    self.window.iter_mut().for_each(|x| *x = 0.0);
    self.window_energy = 0.0;
    self.since_refresh = 0;
  }
}

#[cfg(test)]
mod tests;
