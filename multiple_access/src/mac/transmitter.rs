use std::sync::Arc;

use acoustic_link::{phy_packet::PhySender, traits::OutStream, ChannelError, PhyError};
use crossbeam_channel::{select, Receiver, Sender};

use super::ChannelProbe;
use crate::error::DeliveryError;

/// One frame to put on the air.
/// `done` receives the result once the burst is handed to the sample stream,
/// automatic replies (ACK, PONG) go without it.
pub(crate) struct TxJob {
  pub frame: Vec<u8>,
  pub done: Option<Sender<Result<(), DeliveryError>>>,
}

impl TxJob {
  pub fn reply(frame: Vec<u8>) -> Self {
    Self { frame, done: None }
  }
}

/// The only writer of the sample stream of a node.
/// Runs until the shutdown channel closes, the job channel closes or the stream fails.
pub(crate) struct TransmitWorker<SS> {
  pub sender: PhySender<SS>,
  pub jobs: Receiver<TxJob>,
  pub shutdown: Receiver<()>,
  pub probe: Arc<ChannelProbe>,
}

impl<SS> TransmitWorker<SS>
where
  SS: OutStream<f32, ChannelError>,
{
  pub fn run(mut self) {
    loop {
      select! {
        recv(self.jobs) -> job => match job {
          Ok(job) => {
            if !self.transmit(job) {
              break;
            }
          }
          Err(_) => break,
        },
        recv(self.shutdown) -> _ => break,
      }
    }
    log::debug!("transmit worker exits");
  }

  /// Write one burst. Return false if the stream is broken.
  fn transmit(&mut self, job: TxJob) -> bool {
    let result = self.sender.send(&job.frame);
    let alive = match &result {
      Ok(()) => true,
      Err(PhyError::Modem(err)) => {
        log::warn!("frame of {} bytes not sent: {err}", job.frame.len());
        true
      }
      Err(PhyError::Channel(err)) => {
        log::error!("sample stream failed: {err}");
        self.probe.set_unknown();
        false
      }
    };
    if let Some(done) = job.done {
      let _ = done.send(result.map_err(DeliveryError::from));
    }
    alive
  }
}
