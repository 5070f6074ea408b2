use std::fmt;

use crate::error::FrameError;

/// number of bytes before the payload: destination, source, kind and sequence number
pub const HEADER_SIZE: usize = 3;

/// MAC address to identify a node, [`Address::BROADCAST`] addresses every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub u8);

impl Address {
  pub const BROADCAST: Self = Self(0);

  pub fn is_broadcast(self) -> bool {
    self == Self::BROADCAST
  }
}

impl From<u8> for Address {
  fn from(addr: u8) -> Self {
    Self(addr)
  }
}

impl fmt::Display for Address {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_broadcast() {
      write!(f, "*")
    } else {
      write!(f, "{}", self.0)
    }
  }
}

/// Sequence number of a frame, [`Seq::BITS`] wide.
/// A retransmission repeats the sequence number, ACK and PONG echo it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Seq(u8);

impl Seq {
  pub const BITS: u32 = 6;
  const MASK: u8 = (1 << Self::BITS) - 1;

  /// the sequence number `seq` modulo `2^BITS`
  pub const fn new(seq: u8) -> Self {
    Self(seq & Self::MASK)
  }

  pub const fn value(self) -> u8 {
    self.0
  }

  /// the sequence number of the next frame, wraps around
  pub const fn next(self) -> Self {
    Self::new(self.0.wrapping_add(1))
  }
}

impl fmt::Display for Seq {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// MAC frame type, the numbering is the low 2 bits of the kind byte on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
  Data = 0,
  Ack = 1,
  Ping = 2,
  Pong = 3,
}

impl FrameKind {
  pub const BITS: u32 = 2;
  const MASK: u8 = (1 << Self::BITS) - 1;
}

impl TryFrom<u8> for FrameKind {
  type Error = FrameError;

  fn try_from(id: u8) -> Result<Self, Self::Error> {
    match id {
      0 => Ok(Self::Data),
      1 => Ok(Self::Ack),
      2 => Ok(Self::Ping),
      3 => Ok(Self::Pong),
      _ => Err(FrameError::Malformed("unknown frame kind")),
    }
  }
}

/// The MAC frame, carried by exactly one PHY packet.
/// - `dest`: destination address
/// - `src`: source address
/// - `kind`: frame type
/// - `seq`: sequence number
/// - `payload`: payload data section, no padding
///
/// Wire format: `[dest][src][seq << 2 | kind][payload...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
  dest: Address,
  src: Address,
  kind: FrameKind,
  seq: Seq,
  payload: Vec<u8>,
}

impl Frame {
  /// Create a frame, the payload can hold at most `max_payload` bytes
  /// (see [`Frame::max_payload`]).
  pub fn new(
    dest: Address,
    src: Address,
    kind: FrameKind,
    seq: Seq,
    payload: Vec<u8>,
    max_payload: usize,
  ) -> Result<Self, FrameError> {
    if payload.len() > max_payload {
      return Err(FrameError::PayloadTooLarge {
        len: payload.len(),
        max: max_payload,
      });
    }
    Ok(Self {
      dest,
      src,
      kind,
      seq,
      payload,
    })
  }

  /// payload capacity of a frame in a modem frame of `frame_bytes` bytes
  pub fn max_payload(frame_bytes: usize) -> usize {
    frame_bytes.saturating_sub(HEADER_SIZE)
  }

  pub fn data(
    dest: Address,
    src: Address,
    seq: Seq,
    payload: Vec<u8>,
    max_payload: usize,
  ) -> Result<Self, FrameError> {
    Self::new(dest, src, FrameKind::Data, seq, payload, max_payload)
  }

  fn control(dest: Address, src: Address, kind: FrameKind, seq: Seq) -> Self {
    Self {
      dest,
      src,
      kind,
      seq,
      payload: Vec::new(),
    }
  }

  /// acknowledge the DATA frame `seq`
  pub fn ack(dest: Address, src: Address, seq: Seq) -> Self {
    Self::control(dest, src, FrameKind::Ack, seq)
  }

  pub fn ping(dest: Address, src: Address, seq: Seq) -> Self {
    Self::control(dest, src, FrameKind::Ping, seq)
  }

  /// answer the PING `seq`
  pub fn pong(dest: Address, src: Address, seq: Seq) -> Self {
    Self::control(dest, src, FrameKind::Pong, seq)
  }

  pub fn dest(&self) -> Address {
    self.dest
  }

  pub fn src(&self) -> Address {
    self.src
  }

  pub fn kind(&self) -> FrameKind {
    self.kind
  }

  pub fn seq(&self) -> Seq {
    self.seq
  }

  pub fn payload(&self) -> &[u8] {
    &self.payload
  }

  pub fn into_payload(self) -> Vec<u8> {
    self.payload
  }

  /// number of bytes of the serialized frame
  pub fn len(&self) -> usize {
    HEADER_SIZE + self.payload.len()
  }

  pub fn is_empty(&self) -> bool {
    self.payload.is_empty()
  }

  /// dump the frame into bytes for the PHY layer
  pub fn serialize(&self) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(self.len());
    bytes.push(self.dest.0);
    bytes.push(self.src.0);
    bytes.push(self.seq.0 << FrameKind::BITS | self.kind as u8);
    bytes.extend_from_slice(&self.payload);
    bytes
  }

  /// parse a frame from the bytes of a PHY packet, everything after the header is payload
  pub fn deserialize(bytes: &[u8]) -> Result<Self, FrameError> {
    if bytes.len() < HEADER_SIZE {
      return Err(FrameError::Malformed("shorter than the frame header"));
    }
    let kind_seq = bytes[2];
    Ok(Self {
      dest: Address(bytes[0]),
      src: Address(bytes[1]),
      kind: FrameKind::try_from(kind_seq & FrameKind::MASK)?,
      seq: Seq::new(kind_seq >> FrameKind::BITS),
      payload: bytes[HEADER_SIZE..].to_vec(),
    })
  }
}
