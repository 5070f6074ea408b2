use std::{
  collections::VecDeque,
  io::ErrorKind,
  net::{SocketAddr, UdpSocket},
};

use serde::{Deserialize, Serialize};
use socket2::{Domain, Protocol, Socket, Type};

use crate::{
  error::ChannelError,
  traits::{DuplexStream, InStream, OutStream},
};

use super::READ_WAIT;

/// samples carried by one datagram
pub const DATAGRAM_SAMPLES: usize = 256;
/// large enough for an encoded datagram of [`DATAGRAM_SAMPLES`] samples
const RECV_BUFFER: usize = 2048;

/// A batch of samples in the UDP tunnel.
/// `seq` counts datagrams from one sender, used to report losses.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SampleDatagram {
  pub seq: u32,
  pub samples: Vec<f32>,
}

/// A sample stream tunneled through UDP, standing in for the air between two processes.
/// Samples written are sent to `peer`, samples read come from anyone sending to the local address.
pub struct UdpStream {
  recv_socket: UdpSocket,
  send_socket: UdpSocket,
  peer: SocketAddr,
}

impl UdpStream {
  pub fn new(local: SocketAddr, peer: SocketAddr) -> Result<Self, ChannelError> {
    let socket = Socket::new(Domain::for_address(local), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_read_timeout(Some(READ_WAIT))?;
    socket.bind(&local.into())?;
    let recv_socket: UdpSocket = socket.into();
    let send_socket = recv_socket.try_clone()?;
    Ok(Self {
      recv_socket,
      send_socket,
      peer,
    })
  }

  pub fn local_addr(&self) -> Result<SocketAddr, ChannelError> {
    Ok(self.recv_socket.local_addr()?)
  }
}

/// Receiving half of a [`UdpStream`].
pub struct UdpSource {
  socket: UdpSocket,
  pending: VecDeque<f32>,
  next_seq: Option<u32>,
  recv_buf: Vec<u8>,
}

/// Sending half of a [`UdpStream`].
pub struct UdpSink {
  socket: UdpSocket,
  peer: SocketAddr,
  seq: u32,
}

impl DuplexStream<f32, ChannelError> for UdpStream {
  type Source = UdpSource;
  type Sink = UdpSink;

  fn split(self) -> (Self::Source, Self::Sink) {
    let source = UdpSource {
      socket: self.recv_socket,
      pending: VecDeque::new(),
      next_seq: None,
      recv_buf: vec![0; RECV_BUFFER],
    };
    let sink = UdpSink {
      socket: self.send_socket,
      peer: self.peer,
      seq: 0,
    };
    (source, sink)
  }
}

impl UdpSource {
  /// wait for one datagram, at most [`READ_WAIT`]
  fn receive(&mut self) -> Result<(), ChannelError> {
    let n = match self.socket.recv(&mut self.recv_buf) {
      Ok(n) => n,
      Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => return Ok(()),
      Err(err) => return Err(err.into()),
    };
    let datagram: SampleDatagram = postcard::from_bytes(&self.recv_buf[..n])?;
    if let Some(expected) = self.next_seq {
      if datagram.seq != expected {
        log::debug!("tunnel datagram {expected} lost, got {}", datagram.seq);
      }
    }
    self.next_seq = Some(datagram.seq.wrapping_add(1));
    self.pending.extend(datagram.samples);
    Ok(())
  }
}

impl InStream<f32, ChannelError> for UdpSource {
  fn read(&mut self, buf: &mut [f32]) -> Result<usize, ChannelError> {
    if self.pending.is_empty() {
      self.receive()?;
    }
    let n = std::cmp::min(buf.len(), self.pending.len());
    buf.iter_mut().zip(self.pending.drain(..n)).for_each(|(x, y)| *x = y);
    Ok(n)
  }
}

impl OutStream<f32, ChannelError> for UdpSink {
  fn write(&mut self, buf: &[f32]) -> Result<(), ChannelError> {
    for chunk in buf.chunks(DATAGRAM_SAMPLES) {
      let datagram = SampleDatagram {
        seq: self.seq,
        samples: chunk.to_vec(),
      };
      let bytes = postcard::to_allocvec(&datagram)?;
      self.socket.send_to(&bytes, self.peer)?;
      self.seq = self.seq.wrapping_add(1);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::{SampleDatagram, UdpStream, DATAGRAM_SAMPLES, RECV_BUFFER};
  use crate::traits::{DuplexStream, InStream, OutStream};
  use std::time::{Duration, Instant};

  #[test]
  fn datagram_fits_buffer() {
    let datagram = SampleDatagram {
      seq: u32::MAX,
      samples: vec![f32::MIN; DATAGRAM_SAMPLES],
    };
    assert!(postcard::to_allocvec(&datagram).unwrap().len() <= RECV_BUFFER);
  }

  #[test]
  fn tunnel_between_sockets() {
    let a = UdpStream::new("127.0.0.1:0".parse().unwrap(), "127.0.0.1:9".parse().unwrap()).unwrap();
    let a_addr = a.local_addr().unwrap();
    let b = UdpStream::new("127.0.0.1:0".parse().unwrap(), a_addr).unwrap();
    let (mut rx, _) = a.split();
    let (_, mut tx) = b.split();

    let samples: Vec<f32> = (0..1000).map(|x| x as f32 / 1000.0).collect();
    tx.write(&samples).unwrap();

    let mut received = Vec::new();
    let mut buf = [0.0; 300];
    let start = Instant::now();
    while received.len() < samples.len() && start.elapsed() < Duration::from_secs(2) {
      let n = rx.read(&mut buf).unwrap();
      received.extend_from_slice(&buf[..n]);
    }
    assert_eq!(received, samples);
  }

  #[test]
  fn idle_read_returns_nothing() {
    let a = UdpStream::new("127.0.0.1:0".parse().unwrap(), "127.0.0.1:9".parse().unwrap()).unwrap();
    let (mut rx, _) = a.split();
    assert_eq!(rx.read(&mut [0.0; 16]).unwrap(), 0);
  }
}
