use std::{
  collections::HashMap,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
  thread::{self, JoinHandle},
  time::{Duration, Instant},
};

use acoustic_link::{
  phy_packet::{PhyDecoder, PhyEncoder, PhyReceiver, PhySender},
  traits::DuplexStream,
  ChannelError, DpskModem,
};
use crossbeam_channel::{at, bounded, select, unbounded, Receiver, RecvError, Sender};
use parking_lot::Mutex;
use rand::Rng;

use crate::{
  config::MacConfig,
  error::DeliveryError,
  frame::{Address, Frame, Seq},
  handler::{DeliveryOutcome, MacHandler},
};

/// the power of the channel as seen by the receive worker
mod probe;
use probe::ChannelProbe;
/// the receive worker: decode, filter, dispatch
mod receiver;
use receiver::{Event, ReceiveWorker};
/// the transmit worker: the only writer of the stream
mod transmitter;
use transmitter::{TransmitWorker, TxJob};


/// State of the send side of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacState {
  Idle,
  /// waiting for the channel to be idle for the sense window
  Sensing,
  /// the burst is being handed to the stream
  Transmitting,
  AwaitingAck,
  /// random delay after a busy channel
  Backoff,
}

/// Counters of an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MacStats {
  /// PHY packets with a valid checksum
  pub frames_decoded: u64,
  /// PHY packets dropped for a bad length or checksum
  pub frames_corrupt: u64,
  /// malformed frames and frames for other nodes
  pub frames_ignored: u64,
}

/// A completed ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingReply {
  pub from: Address,
  /// from the moment the PING burst is handed to the stream to the moment the PONG is decoded
  pub rtt: Duration,
}

/// The outstanding transmission of one `send`.
struct Outstanding {
  frame: Frame,
  bytes: Vec<u8>,
  attempts: usize,
}

impl Outstanding {
  fn new(frame: Frame) -> Self {
    let bytes = frame.serialize();
    Self {
      frame,
      bytes,
      attempts: 0,
    }
  }
}

/// MAC layer object of one node, built on a duplex sample stream.
///
/// Two worker threads run for the lifetime of the engine:
/// the receive worker owns the input half of the stream,
/// the transmit worker owns the output half.
/// `send` and `ping` run on the calling thread, one exchange at a time.
pub struct MacEngine {
  address: Address,
  config: MacConfig,
  encoder: PhyEncoder,
  max_payload: usize,
  handler: Arc<dyn MacHandler>,
  probe: Arc<ChannelProbe>,
  stats: Arc<Mutex<MacStats>>,
  state: Mutex<MacState>,
  /// held for a whole exchange
  send_lock: Mutex<()>,
  jobs: Sender<TxJob>,
  events: Receiver<Event>,
  /// the read error that stopped the receive worker, disconnected once the worker is gone
  receive_failure: Receiver<ChannelError>,
  /// sequence number of the next DATA or PING frame
  tx_seq: Mutex<Seq>,
  /// dropped to stop the engine
  shutdown_tx: Mutex<Option<Sender<()>>>,
  shutdown: Receiver<()>,
  stopped: AtomicBool,
  workers: Mutex<Vec<JoinHandle<()>>>,
}

impl MacEngine {
  /// Start an engine for node `address` on `stream`.
  /// The stream is owned by the engine until it stops.
  pub fn start<S, H>(
    address: Address,
    modem: Arc<DpskModem>,
    stream: S,
    config: MacConfig,
    handler: H,
  ) -> Result<Self, DeliveryError>
  where
    S: DuplexStream<f32, ChannelError>,
    H: MacHandler + 'static,
  {
    if address.is_broadcast() {
      return Err(DeliveryError::InvalidAddress(address));
    }
    let max_payload = Frame::max_payload(modem.config().frame_bytes);
    let encoder = PhyEncoder::new(modem.clone());
    let handler: Arc<dyn MacHandler> = Arc::new(handler);
    let probe = Arc::new(ChannelProbe::new());
    let stats = Arc::new(Mutex::new(MacStats::default()));
    let (jobs_tx, jobs_rx) = unbounded();
    let (events_tx, events_rx) = unbounded();
    let (failure_tx, failure_rx) = bounded(1);
    let (shutdown_tx, shutdown_rx) = bounded(0);

    let (source, sink) = stream.split();
    let receive_worker = ReceiveWorker {
      address,
      receiver: PhyReceiver::new(source, PhyDecoder::new(modem)),
      handler: handler.clone(),
      replies: jobs_tx.clone(),
      events: events_tx,
      failure: failure_tx,
      shutdown: shutdown_rx.clone(),
      probe: probe.clone(),
      stats: stats.clone(),
      delivered: HashMap::new(),
    };
    let transmit_worker = TransmitWorker {
      sender: PhySender::new(sink, encoder.clone()),
      jobs: jobs_rx,
      shutdown: shutdown_rx.clone(),
      probe: probe.clone(),
    };

    let rx_handle = thread::Builder::new()
      .name(format!("mac-rx-{address}"))
      .spawn(move || receive_worker.run())
      .map_err(ChannelError::from)?;
    let tx_handle = thread::Builder::new()
      .name(format!("mac-tx-{address}"))
      .spawn(move || transmit_worker.run());
    let engine = Self {
      address,
      config,
      encoder,
      max_payload,
      handler,
      probe,
      stats,
      state: Mutex::new(MacState::Idle),
      send_lock: Mutex::new(()),
      jobs: jobs_tx,
      events: events_rx,
      receive_failure: failure_rx,
      // a restarted node does not repeat the sequence numbers its peers saw last
      tx_seq: Mutex::new(Seq::new(rand::random())),
      shutdown_tx: Mutex::new(Some(shutdown_tx)),
      shutdown: shutdown_rx,
      stopped: AtomicBool::new(false),
      workers: Mutex::new(vec![rx_handle]),
    };
    // on failure the engine is dropped, which stops the receive worker
    engine.workers.lock().push(tx_handle.map_err(ChannelError::from)?);
    log::info!("node {address} started");
    Ok(engine)
  }

  pub fn address(&self) -> Address {
    self.address
  }

  pub fn config(&self) -> &MacConfig {
    &self.config
  }

  pub fn state(&self) -> MacState {
    *self.state.lock()
  }

  pub fn stats(&self) -> MacStats {
    *self.stats.lock()
  }

  /// largest payload of one `send`
  pub fn max_payload(&self) -> usize {
    self.max_payload
  }

  /// Send `payload` to `dest` and wait for the ACK.
  /// Return the number of transmissions it took.
  /// A broadcast is transmitted once and never acknowledged.
  /// The outcome is also reported to [`MacHandler::on_delivery`].
  pub fn send(&self, dest: Address, payload: &[u8]) -> Result<usize, DeliveryError> {
    if dest == self.address {
      return Err(DeliveryError::InvalidAddress(dest));
    }
    let _guard = self.send_lock.lock();
    let frame = Frame::data(dest, self.address, self.next_seq(), payload.to_vec(), self.max_payload)?;
    self.drain_events();
    let mut outstanding = Outstanding::new(frame);
    let result = self.deliver(&mut outstanding);
    self.set_state(MacState::Idle);

    let attempts = outstanding.attempts;
    let outcome = match &result {
      Ok(()) => DeliveryOutcome::Delivered { attempts },
      Err(DeliveryError::Cancelled) => DeliveryOutcome::Cancelled,
      Err(_) => DeliveryOutcome::Failed { attempts },
    };
    log::debug!("node {}: send to {dest}: {outcome:?}", self.address);
    self.handler.on_delivery(dest, &outcome);
    result.map(|()| attempts)
  }

  /// Send a PING to `dest` and wait at most `timeout` for the PONG.
  /// A PING to the broadcast address completes with the first PONG.
  pub fn ping(&self, dest: Address, timeout: Duration) -> Result<PingReply, DeliveryError> {
    if dest == self.address {
      return Err(DeliveryError::InvalidAddress(dest));
    }
    let _guard = self.send_lock.lock();
    let seq = self.next_seq();
    self.drain_events();
    let result = self.exchange_ping(dest, seq, timeout);
    self.set_state(MacState::Idle);
    result
  }

  fn exchange_ping(&self, dest: Address, seq: Seq, timeout: Duration) -> Result<PingReply, DeliveryError> {
    self.acquire_channel()?;
    self.set_state(MacState::Transmitting);
    let (sent, airtime) = self.transmit(&Frame::ping(dest, self.address, seq).serialize())?;
    self.set_state(MacState::AwaitingAck);

    let timer = at(sent + airtime + timeout);
    loop {
      select! {
        recv(self.events) -> event => match event {
          Ok(Event::Pong { from, seq: echo, at })
            if (from == dest || dest.is_broadcast()) && echo == seq && at >= sent =>
          {
            return Ok(PingReply { from, rtt: at - sent });
          }
          Ok(event) => log::trace!("node {}: unexpected {event:?}", self.address),
          Err(_) => return Err(self.closed()),
        },
        recv(self.receive_failure) -> failure => return Err(self.receiver_gone(failure)),
        recv(self.shutdown) -> _ => return Err(DeliveryError::Cancelled),
        recv(timer) -> _ => return Err(DeliveryError::Timeout { attempts: 1 }),
      }
    }
  }

  /// Stop both workers and release the stream.
  /// An exchange in progress on another thread returns [`DeliveryError::Cancelled`].
  /// Stopping twice is harmless.
  pub fn stop(&self) {
    if self.stopped.swap(true, Ordering::AcqRel) {
      return;
    }
    self.shutdown_tx.lock().take();
    let workers: Vec<_> = self.workers.lock().drain(..).collect();
    workers.into_iter().for_each(|worker| {
      if worker.join().is_err() {
        log::error!("node {}: a worker panicked", self.address);
      }
    });
    log::info!("node {} stopped", self.address);
  }

  fn set_state(&self, state: MacState) {
    *self.state.lock() = state;
  }

  /// drop the replies of earlier exchanges
  fn drain_events(&self) {
    let stale = self.events.try_iter().count();
    if stale > 0 {
      log::trace!("node {}: dropped {stale} stale events", self.address);
    }
  }

  fn next_seq(&self) -> Seq {
    let mut tx_seq = self.tx_seq.lock();
    let seq = *tx_seq;
    *tx_seq = seq.next();
    seq
  }

  /// the error for a closed worker channel
  fn closed(&self) -> DeliveryError {
    if self.stopped.load(Ordering::Acquire) {
      return DeliveryError::Cancelled;
    }
    match self.receive_failure.try_recv() {
      Ok(err) => DeliveryError::Channel(err),
      Err(_) => DeliveryError::Channel(ChannelError::Closed),
    }
  }

  /// the error once the receive worker has stopped: its read error the first time, then `Closed`
  fn receiver_gone(&self, failure: Result<ChannelError, RecvError>) -> DeliveryError {
    match failure {
      Ok(err) => DeliveryError::Channel(err),
      Err(_) => self.closed(),
    }
  }

  /// Transmit the DATA frame until it is acknowledged or the attempts run out.
  fn deliver(&self, outstanding: &mut Outstanding) -> Result<(), DeliveryError> {
    let (dest, seq) = (outstanding.frame.dest(), outstanding.frame.seq());
    let max_attempts = self.config.max_attempts.max(1);
    loop {
      self.acquire_channel()?;

      self.set_state(MacState::Transmitting);
      outstanding.attempts += 1;
      let (sent, airtime) = self.transmit(&outstanding.bytes)?;
      if dest.is_broadcast() {
        return Ok(());
      }

      self.set_state(MacState::AwaitingAck);
      if self.wait_ack(dest, seq, sent, airtime + self.config.ack_timeout)? {
        return Ok(());
      }
      log::debug!(
        "node {}: no ACK {seq} from {dest}, attempt {}/{max_attempts}",
        self.address,
        outstanding.attempts
      );
      if outstanding.attempts >= max_attempts {
        return Err(DeliveryError::Timeout {
          attempts: outstanding.attempts,
        });
      }
    }
  }

  /// Sense the channel, back off while it is busy.
  /// Return once the channel has been idle for the sense window.
  fn acquire_channel(&self) -> Result<(), DeliveryError> {
    let mut rng = rand::thread_rng();
    let mut stage = 0;
    loop {
      self.set_state(MacState::Sensing);
      if self.sense()? {
        return Ok(());
      }
      self.set_state(MacState::Backoff);
      let delay = backoff_delay(stage, self.config.backoff_slot, &mut rng);
      log::trace!("node {}: channel busy, backoff {delay:?}", self.address);
      stage = (stage + 1).min(self.config.max_backoff_stage);
      self.sleep(delay)?;
    }
  }

  /// true if the channel stays idle for the sense window, false as soon as it is busy
  fn sense(&self) -> Result<bool, DeliveryError> {
    let deadline = Instant::now() + self.config.sense_window;
    loop {
      if self.probe.is_busy(self.config.busy_threshold) {
        return Ok(false);
      }
      if Instant::now() >= deadline {
        return Ok(true);
      }
      self.sleep(self.config.sense_poll)?;
    }
  }

  fn sleep(&self, duration: Duration) -> Result<(), DeliveryError> {
    select! {
      recv(self.shutdown) -> _ => Err(DeliveryError::Cancelled),
      recv(self.receive_failure) -> failure => Err(self.receiver_gone(failure)),
      default(duration) => Ok(()),
    }
  }

  /// Hand the frame to the transmit worker, wait until it is written.
  /// Return the moment it was handed over and the time it takes to play the burst.
  fn transmit(&self, bytes: &[u8]) -> Result<(Instant, Duration), DeliveryError> {
    let (done_tx, done_rx) = bounded(1);
    let job = TxJob {
      frame: bytes.to_vec(),
      done: Some(done_tx),
    };
    let sent = Instant::now();
    self.jobs.send(job).map_err(|_| self.closed())?;
    select! {
      recv(done_rx) -> result => result.map_err(|_| self.closed())??,
      recv(self.shutdown) -> _ => return Err(DeliveryError::Cancelled),
    }
    let samples = self.encoder.burst_len(bytes.len());
    let sample_rate = self.encoder.modem().config().sample_rate;
    let airtime = Duration::from_secs_f64(samples as f64 / sample_rate as f64);
    Ok((sent, airtime))
  }

  /// true on the ACK of DATA `seq` from `dest`, decoded after the DATA was sent and before the timeout
  fn wait_ack(&self, dest: Address, seq: Seq, sent: Instant, timeout: Duration) -> Result<bool, DeliveryError> {
    let timer = at(Instant::now() + timeout);
    loop {
      select! {
        recv(self.events) -> event => match event {
          Ok(Event::Ack { from, seq: echo, at }) if from == dest && echo == seq && at >= sent => {
            return Ok(true);
          }
          Ok(event) => log::trace!("node {}: unexpected {event:?}", self.address),
          Err(_) => return Err(self.closed()),
        },
        recv(self.receive_failure) -> failure => return Err(self.receiver_gone(failure)),
        recv(self.shutdown) -> _ => return Err(DeliveryError::Cancelled),
        recv(timer) -> _ => return Ok(false),
      }
    }
  }
}

impl Drop for MacEngine {
  fn drop(&mut self) {
    self.stop();
  }
}

/// random delay of `0..2^(stage + 1)` slots
pub(crate) fn backoff_delay<R: Rng>(stage: u32, slot: Duration, rng: &mut R) -> Duration {
  let window = 2_u32 << stage.min(16);
  slot * rng.gen_range(0..window)
}
