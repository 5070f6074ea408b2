use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  block_buffer::ConcurrentBuffer,
  error::ChannelError,
  helper::add_noise,
  traits::{DuplexStream, InStream, OutStream},
};

use super::READ_WAIT;

struct Shared {
  /// (port id, inbox) of every attached port
  ports: Mutex<Vec<(usize, ConcurrentBuffer<f32>)>>,
  next_id: Mutex<usize>,
  noise: f32,
}

/// An in-process shared acoustic medium.
///
/// Every attached port is one node's microphone/speaker pair:
/// samples written by a port are heard by all the other ports, never by itself.
/// One write reaches the listeners as one contiguous block.
/// Clones refer to the same medium.
#[derive(Clone)]
pub struct Medium(Arc<Shared>);

impl Medium {
  /// a noiseless medium
  pub fn new() -> Self {
    Self::with_noise(0.0)
  }

  /// a medium adding uniform noise in `[-amplitude, amplitude)` to what every listener hears
  pub fn with_noise(amplitude: f32) -> Self {
    Self(Arc::new(Shared {
      ports: Mutex::new(Vec::new()),
      next_id: Mutex::new(0),
      noise: amplitude,
    }))
  }

  /// Attach a new node to the medium.
  /// It hears everything written after this call.
  pub fn attach(&self) -> MediumPort {
    let id = {
      let mut next = self.0.next_id.lock();
      *next += 1;
      *next
    };
    let inbox = ConcurrentBuffer::new();
    self.0.ports.lock().push((id, inbox.clone()));
    log::trace!("port {id} attached to the medium");
    MediumPort {
      id,
      inbox,
      medium: self.clone(),
    }
  }

  /// number of attached ports
  pub fn ports(&self) -> usize {
    self.0.ports.lock().len()
  }

  fn detach(&self, id: usize) {
    self.0.ports.lock().retain(|(port, _)| *port != id);
    log::trace!("port {id} detached from the medium");
  }

  fn broadcast(&self, from: usize, samples: &[f32]) {
    let ports = self.0.ports.lock();
    let listeners = ports.iter().filter(|(id, _)| *id != from);
    if self.0.noise > 0.0 {
      let mut rng = rand::thread_rng();
      listeners.for_each(|(_, inbox)| {
        let mut heard = samples.to_vec();
        add_noise(&mut heard, self.0.noise, &mut rng);
        inbox.push(heard);
      });
    } else {
      listeners.for_each(|(_, inbox)| inbox.push_slice(samples));
    }
  }
}

impl Default for Medium {
  fn default() -> Self {
    Self::new()
  }
}

/// One node's handle on a [`Medium`], split it into a [`MediumSource`] and a [`MediumSink`].
pub struct MediumPort {
  id: usize,
  inbox: ConcurrentBuffer<f32>,
  medium: Medium,
}

/// Receiving half of a [`MediumPort`]. The port leaves the medium when the source is dropped.
pub struct MediumSource {
  id: usize,
  inbox: ConcurrentBuffer<f32>,
  medium: Medium,
}

/// Sending half of a [`MediumPort`].
pub struct MediumSink {
  id: usize,
  medium: Medium,
}

impl DuplexStream<f32, ChannelError> for MediumPort {
  type Source = MediumSource;
  type Sink = MediumSink;

  fn split(self) -> (Self::Source, Self::Sink) {
    let sink = MediumSink {
      id: self.id,
      medium: self.medium.clone(),
    };
    let source = MediumSource {
      id: self.id,
      inbox: self.inbox,
      medium: self.medium,
    };
    (source, sink)
  }
}

impl InStream<f32, ChannelError> for MediumSource {
  fn read(&mut self, buf: &mut [f32]) -> Result<usize, ChannelError> {
    Ok(self.inbox.pop_slice_timeout(buf, READ_WAIT))
  }
}

impl Drop for MediumSource {
  fn drop(&mut self) {
    self.medium.detach(self.id);
  }
}

impl OutStream<f32, ChannelError> for MediumSink {
  fn write(&mut self, buf: &[f32]) -> Result<(), ChannelError> {
    self.medium.broadcast(self.id, buf);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::Medium;
  use crate::traits::{DuplexStream, InStream, OutStream};

  #[test]
  fn others_hear_writer() {
    let medium = Medium::new();
    let (mut rx_a, mut tx_a) = medium.attach().split();
    let (mut rx_b, _tx_b) = medium.attach().split();
    let (mut rx_c, _tx_c) = medium.attach().split();

    tx_a.write(&[1.0, 2.0, 3.0]).unwrap();
    let mut buf = [0.0; 8];
    assert_eq!(rx_b.read(&mut buf).unwrap(), 3);
    assert_eq!(&buf[..3], &[1.0, 2.0, 3.0]);
    assert_eq!(rx_c.read(&mut buf).unwrap(), 3);
    // no echo
    assert_eq!(rx_a.read(&mut buf).unwrap(), 0);
  }

  #[test]
  fn dropped_source_detaches() {
    let medium = Medium::new();
    let (_rx_a, mut tx_a) = medium.attach().split();
    let (rx_b, _tx_b) = medium.attach().split();
    assert_eq!(medium.ports(), 2);
    drop(rx_b);
    assert_eq!(medium.ports(), 1);
    tx_a.write(&[0.5; 100]).unwrap();
  }

  #[test]
  fn noisy_copies() {
    let medium = Medium::with_noise(0.1);
    let (_rx_a, mut tx_a) = medium.attach().split();
    let (mut rx_b, _tx_b) = medium.attach().split();
    tx_a.write(&[0.0; 64]).unwrap();
    let mut buf = [0.0; 64];
    assert_eq!(rx_b.read(&mut buf).unwrap(), 64);
    assert!(buf.iter().all(|x| x.abs() <= 0.1));
    assert!(buf.iter().any(|&x| x != 0.0));
  }
}
