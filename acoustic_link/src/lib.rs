/// common helper functions
pub mod helper;

/// define [`traits::InStream`], [`traits::OutStream`] and [`traits::DuplexStream`] traits.
pub mod traits;

/// error types of the modem and the sample streams
pub mod error;

/// modem parameters and their default values
pub mod config;

/// implementors of the stream traits, where the stream data is of type f32.
pub mod sample_stream;

/// the DPSK modem and PHY packets carried by it.
pub mod phy_packet;

/// blockwise buffer and its thread safe wrapper.
pub mod block_buffer;

pub use config::ModemConfig;
pub use error::{ChannelError, ModemError, PhyError};
pub use phy_packet::DpskModem;
