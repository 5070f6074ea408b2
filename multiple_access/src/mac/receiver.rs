use std::{
  collections::HashMap,
  sync::Arc,
  time::{Duration, Instant},
};

use acoustic_link::{
  phy_packet::{PhyPacket, PhyReceiver},
  traits::InStream,
  ChannelError,
};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use super::{transmitter::TxJob, ChannelProbe, MacStats};
use crate::{
  frame::{Address, Frame, FrameKind, Seq},
  handler::MacHandler,
};

/// wait between two reads when the stream has nothing
const IDLE_WAIT: Duration = Duration::from_millis(1);

/// Replies the send side is waiting for, stamped with the time they were decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
  Ack { from: Address, seq: Seq, at: Instant },
  Pong { from: Address, seq: Seq, at: Instant },
}

/// The only reader of the sample stream of a node.
/// Decodes frames, answers DATA and PING, forwards ACK and PONG to the send side.
/// A read error stops the worker, the error goes to `failure`.
pub(crate) struct ReceiveWorker<SS> {
  pub address: Address,
  pub receiver: PhyReceiver<SS>,
  pub handler: Arc<dyn MacHandler>,
  pub replies: Sender<TxJob>,
  pub events: Sender<Event>,
  pub failure: Sender<ChannelError>,
  pub shutdown: Receiver<()>,
  pub probe: Arc<ChannelProbe>,
  pub stats: Arc<Mutex<MacStats>>,
  /// sequence number of the last DATA frame delivered, per source
  pub delivered: HashMap<Address, Seq>,
}

impl<SS> ReceiveWorker<SS>
where
  SS: InStream<f32, ChannelError>,
{
  pub fn run(mut self) {
    let mut packets = Vec::new();
    loop {
      let n = match self.receiver.poll(&mut packets) {
        Ok(n) => n,
        Err(err) => {
          log::error!("node {}: sample stream failed: {err}", self.address);
          let _ = self.failure.try_send(err);
          break;
        }
      };
      self.publish();
      packets.drain(..).for_each(|packet| self.dispatch(packet));

      let wait = if n == 0 { IDLE_WAIT } else { Duration::ZERO };
      match self.shutdown.recv_timeout(wait) {
        Err(RecvTimeoutError::Timeout) => {}
        _ => break,
      }
    }
    self.probe.set_unknown();
    log::debug!("node {}: receive worker exits", self.address);
  }

  /// share the channel state with the send side: a frame being received keeps the channel busy
  fn publish(&self) {
    let decoder = self.receiver.decoder();
    let power = if decoder.in_frame() {
      f32::INFINITY
    } else {
      decoder.power()
    };
    self.probe.publish(power);
    let phy = decoder.stats();
    let mut stats = self.stats.lock();
    stats.frames_decoded = phy.packets;
    stats.frames_corrupt = phy.corrupt;
  }

  fn dispatch(&mut self, packet: PhyPacket) {
    let frame = match Frame::deserialize(&packet) {
      Ok(frame) => frame,
      Err(err) => {
        log::trace!("node {}: {err}", self.address);
        self.stats.lock().frames_ignored += 1;
        return;
      }
    };
    let (src, dest, seq) = (frame.src(), frame.dest(), frame.seq());
    if src == self.address || (dest != self.address && !dest.is_broadcast()) {
      log::trace!("node {}: ignored {:?} {src} -> {dest}", self.address, frame.kind());
      self.stats.lock().frames_ignored += 1;
      return;
    }
    log::debug!("node {}: received {:?} {seq} from {src}", self.address, frame.kind());

    match frame.kind() {
      FrameKind::Data => {
        // a repeated DATA frame means the ACK was lost, acknowledge it again
        if self.delivered.insert(src, seq) == Some(seq) {
          log::debug!("node {}: duplicate {seq} from {src}", self.address);
        } else {
          self.handler.on_data(src, frame.payload());
        }
        if !dest.is_broadcast() {
          self.reply(Frame::ack(src, self.address, seq));
        }
      }
      FrameKind::Ping => self.reply(Frame::pong(src, self.address, seq)),
      FrameKind::Ack => self.notify(Event::Ack {
        from: src,
        seq,
        at: Instant::now(),
      }),
      FrameKind::Pong => self.notify(Event::Pong {
        from: src,
        seq,
        at: Instant::now(),
      }),
    }
  }

  fn reply(&self, frame: Frame) {
    if self.replies.send(TxJob::reply(frame.serialize())).is_err() {
      log::debug!("node {}: transmit worker is gone, reply dropped", self.address);
    }
  }

  /// nobody waits for the event when no exchange is in progress, it is dropped at the next exchange
  fn notify(&self, event: Event) {
    let _ = self.events.send(event);
  }
}
