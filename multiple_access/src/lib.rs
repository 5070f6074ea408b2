//! Shared medium MAC layer on top of the acoustic PHY.
//!
//! Every node owns a [`MacEngine`]: it senses the channel before transmitting,
//! backs off while the channel is busy, acknowledges unicast DATA frames
//! and answers PING with PONG.

/// Timing and retry parameters
mod config;
pub use config::MacConfig;

mod error;
pub use error::{DeliveryError, FrameError};

/// Define the MAC frame:
///
/// - MAC address
/// - MAC frame type
/// - MAC frame and its wire format
mod frame;
pub use frame::{Address, Frame, FrameKind, Seq, HEADER_SIZE};

/// Application callbacks
mod handler;
pub use handler::{DeliveryOutcome, Inbound, MacHandler};

/// CSMA with ACK, the MAC layer object
mod mac;
pub use mac::{MacEngine, MacState, MacStats, PingReply};
