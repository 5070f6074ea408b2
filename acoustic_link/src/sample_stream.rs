use std::time::Duration;

/// type trait alias
mod traits;
pub use traits::{SampleDuplexStream, SampleInStream, SampleOutStream};

/// sample stream IO with cpal audio I/O
#[cfg(feature = "audio")]
mod cpal_stream;
/// sample stream IO with hound wav file IO
mod hound_stream;
/// sample stream IO with a concurrent buffer, read out the written samples
mod loopback_stream;
/// several nodes sharing one in-process medium
mod medium;
/// sample stream tunneled through UDP datagrams
mod udp_stream;

#[cfg(feature = "audio")]
pub use cpal_stream::{CpalSink, CpalSource, CpalStream};
pub use hound_stream::{HoundInStream, HoundOutStream};
pub use loopback_stream::LoopBackStream;
pub use medium::{Medium, MediumPort, MediumSink, MediumSource};
pub use udp_stream::{SampleDatagram, UdpSink, UdpSource, UdpStream, DATAGRAM_SAMPLES};

/// the longest time a `read` on a live stream waits for new samples
pub const READ_WAIT: Duration = Duration::from_millis(5);
