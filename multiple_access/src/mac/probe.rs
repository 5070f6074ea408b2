use std::sync::atomic::{AtomicU32, Ordering};

/// Latest signal power seen by the receive worker, shared with the send side.
/// The value is unknown (NaN) until the first read and after the receive worker stops.
#[derive(Debug)]
pub(crate) struct ChannelProbe(AtomicU32);

impl ChannelProbe {
  pub fn new() -> Self {
    Self(AtomicU32::new(f32::NAN.to_bits()))
  }

  pub fn publish(&self, power: f32) {
    self.0.store(power.to_bits(), Ordering::Release);
  }

  pub fn set_unknown(&self) {
    self.publish(f32::NAN);
  }

  pub fn power(&self) -> f32 {
    f32::from_bits(self.0.load(Ordering::Acquire))
  }

  /// an unknown power counts as busy
  pub fn is_busy(&self, threshold: f32) -> bool {
    !(self.power() < threshold)
  }
}

#[cfg(test)]
mod tests {
  use super::ChannelProbe;

  #[test]
  fn unknown_is_busy() {
    let probe = ChannelProbe::new();
    assert!(probe.power().is_nan());
    assert!(probe.is_busy(1e-3));

    probe.publish(1e-4);
    assert!(!probe.is_busy(1e-3));
    probe.publish(1e-3);
    assert!(probe.is_busy(1e-3));
    probe.publish(f32::INFINITY);
    assert!(probe.is_busy(1e-3));

    probe.set_unknown();
    assert!(probe.is_busy(1e-3));
  }
}
