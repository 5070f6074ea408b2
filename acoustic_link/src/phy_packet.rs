//! Frame: a audio signal.
//! A frame consists of a preamble section and a payload section.
//!
//! Packet: a chunk of bytes.
//! A packet is carried by exactly one frame, it knows its own length and checksum.

/// define the types and traits related to physics layer packet
pub mod traits;
pub use traits::{FrameDetector, FramePayload, FramePreamble, PhyPacket, PreambleGen};

/// cross correlation kernels used to locate a preamble
pub mod correlation;
/// implementors of [`FrameDetector`]: audio stream framing algorithms.
pub mod frame_detect;
/// the DPSK modem: bytes to samples and back.
pub mod modem;
/// implementors of [`PreambleGen`]: preamble sequences.
pub mod preambles;

/// Bytes packet (packet type [`PhyPacket`]) transmission on audio PCM sample streams.  
/// A sender is built on an output stream and a modem.  
/// A receiver is built on an input stream and a streaming decoder.  
pub mod txrx;

pub use correlation::{Correlator, DirectCorrelator, FftCorrelator};
pub use modem::DpskModem;
pub use txrx::{PhyDecoder, PhyEncoder, PhyReceiver, PhySender, PhyStats};
