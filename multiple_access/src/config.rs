use std::time::Duration;

/// Timing and retry parameters of a MAC engine.
///
/// - `sense_window`: the channel must be idle this long before a transmission
/// - `sense_poll`: interval between two looks at the channel while sensing
/// - `busy_threshold`: signal power at or above which the channel is busy
/// - `backoff_slot`: unit of the random backoff delay
/// - `max_backoff_stage`: the backoff delay is drawn from `0..2^(stage + 1)` slots, the stage stops growing here
/// - `ack_timeout`: wait for an ACK after the frame has been played
/// - `max_attempts`: transmissions of one DATA frame before giving up
/// - `ping_timeout`: default wait for a PONG
#[derive(Debug, Clone, PartialEq)]
pub struct MacConfig {
  pub sense_window: Duration,
  pub sense_poll: Duration,
  pub busy_threshold: f32,
  pub backoff_slot: Duration,
  pub max_backoff_stage: u32,
  pub ack_timeout: Duration,
  pub max_attempts: usize,
  pub ping_timeout: Duration,
}

impl MacConfig {
  pub const SENSE_WINDOW: Duration = Duration::from_millis(10);
  pub const SENSE_POLL: Duration = Duration::from_millis(1);
  pub const BUSY_THRESHOLD: f32 = 1e-3;
  pub const BACKOFF_SLOT: Duration = Duration::from_millis(5);
  pub const MAX_BACKOFF_STAGE: u32 = 6;
  pub const ACK_TIMEOUT: Duration = Duration::from_millis(200);
  pub const MAX_ATTEMPTS: usize = 5;
  pub const PING_TIMEOUT: Duration = Duration::from_secs(1);
}

impl Default for MacConfig {
  fn default() -> Self {
    Self {
      sense_window: Self::SENSE_WINDOW,
      sense_poll: Self::SENSE_POLL,
      busy_threshold: Self::BUSY_THRESHOLD,
      backoff_slot: Self::BACKOFF_SLOT,
      max_backoff_stage: Self::MAX_BACKOFF_STAGE,
      ack_timeout: Self::ACK_TIMEOUT,
      max_attempts: Self::MAX_ATTEMPTS,
      ping_timeout: Self::PING_TIMEOUT,
    }
  }
}
