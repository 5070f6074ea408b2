use acoustic_link::{ChannelError, ModemError, PhyError};
use thiserror::Error;

use crate::frame::Address;

/// Errors of building or parsing a MAC frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
  /// the bytes are not a MAC frame
  #[error("malformed frame: {0}")]
  Malformed(&'static str),

  #[error("payload of {len} bytes exceeds the frame payload capacity of {max} bytes")]
  PayloadTooLarge { len: usize, max: usize },
}

/// Why a send or a ping did not complete.
#[derive(Debug, Error)]
pub enum DeliveryError {
  /// no ACK (or PONG) after every allowed attempt
  #[error("no reply after {attempts} attempts")]
  Timeout { attempts: usize },

  /// the engine was stopped before the exchange completed
  #[error("cancelled, the engine is stopped")]
  Cancelled,

  #[error(transparent)]
  Frame(#[from] FrameError),

  #[error("modem error: {0}")]
  Modem(#[from] ModemError),

  /// the sample stream failed, the engine can not transmit or receive any more
  #[error("channel error: {0}")]
  Channel(#[from] ChannelError),

  /// the broadcast address can not own an engine, a node can not send to itself
  #[error("invalid address {0}")]
  InvalidAddress(Address),
}

impl From<PhyError> for DeliveryError {
  fn from(err: PhyError) -> Self {
    match err {
      PhyError::Modem(err) => err.into(),
      PhyError::Channel(err) => err.into(),
    }
  }
}
