use crossbeam_channel::Sender;

use crate::frame::Address;

/// Result of one `send`, reported to [`MacHandler::on_delivery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
  /// acknowledged by the destination (or put on the air, for broadcast)
  Delivered { attempts: usize },
  /// not acknowledged after `attempts` transmissions, or the channel failed
  Failed { attempts: usize },
  /// the engine stopped first
  Cancelled,
}

/// Application callbacks of a MAC engine.
/// `on_data` is called on the receive worker thread, keep it short.
/// `on_delivery` is called on the thread calling `send`.
pub trait MacHandler: Send + Sync {
  /// a DATA frame for this node (or broadcast) from `src`
  fn on_data(&self, src: Address, payload: &[u8]);

  fn on_delivery(&self, _dest: Address, _outcome: &DeliveryOutcome) {}
}

/// Everything a [`MacHandler`] is told, as a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
  Data { src: Address, payload: Vec<u8> },
  Delivery { dest: Address, outcome: DeliveryOutcome },
}

/// forward the callbacks into a channel
impl MacHandler for Sender<Inbound> {
  fn on_data(&self, src: Address, payload: &[u8]) {
    let data = Inbound::Data {
      src,
      payload: payload.to_vec(),
    };
    if self.send(data).is_err() {
      log::debug!("inbound channel closed, data from {src} dropped");
    }
  }

  fn on_delivery(&self, dest: Address, outcome: &DeliveryOutcome) {
    let delivery = Inbound::Delivery {
      dest,
      outcome: *outcome,
    };
    if self.send(delivery).is_err() {
      log::debug!("inbound channel closed, outcome of the send to {dest} dropped");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::{DeliveryOutcome, Inbound, MacHandler};
  use crate::frame::Address;
  use crossbeam_channel::unbounded;

  #[test]
  fn channel_handler_forwards() {
    let (tx, rx) = unbounded();
    tx.on_data(Address(3), b"hi");
    tx.on_delivery(Address(4), &DeliveryOutcome::Failed { attempts: 5 });
    assert_eq!(
      rx.try_iter().collect::<Vec<_>>(),
      vec![
        Inbound::Data {
          src: Address(3),
          payload: b"hi".to_vec()
        },
        Inbound::Delivery {
          dest: Address(4),
          outcome: DeliveryOutcome::Failed { attempts: 5 }
        },
      ]
    );
  }

  #[test]
  fn closed_channel_drops_quietly() {
    let (tx, rx) = unbounded::<Inbound>();
    drop(rx);
    tx.on_data(Address(3), b"lost");
    tx.on_delivery(Address(3), &DeliveryOutcome::Cancelled);
  }
}
