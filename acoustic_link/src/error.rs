use thiserror::Error;

/// Errors of the DPSK modem.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModemError {
  /// no correlation peak above the detection threshold, there is no frame in the samples
  #[error("preamble not found")]
  PreambleNotFound,

  /// the payload does not fit in one modulated frame
  #[error("payload of {len} bytes exceeds the frame capacity of {max} bytes")]
  PayloadTooLarge { len: usize, max: usize },

  /// the modem parameters cannot work together
  #[error("invalid modem configuration: {0}")]
  InvalidConfig(String),
}

/// Errors of the underlying sample stream.
/// A channel error is fatal to whoever owns the stream.
#[derive(Debug, Error)]
pub enum ChannelError {
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("WAV file error: {0}")]
  Wav(#[from] hound::Error),

  #[error("datagram codec error: {0}")]
  Encode(#[from] postcard::Error),

  /// audio device failure, the message is reported by the audio backend
  #[error("audio device error: {0}")]
  Device(String),

  /// the other end of the stream is gone
  #[error("channel closed")]
  Closed,
}

/// Errors of sending one PHY packet: the modem refused the frame or the stream failed.
#[derive(Debug, Error)]
pub enum PhyError {
  #[error(transparent)]
  Modem(#[from] ModemError),

  #[error(transparent)]
  Channel(#[from] ChannelError),
}
