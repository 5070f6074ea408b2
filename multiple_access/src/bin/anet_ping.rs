use std::{
  net::SocketAddr,
  sync::Arc,
  thread,
  time::{Duration, Instant},
};

use acoustic_link::{
  sample_stream::{Medium, UdpStream},
  traits::DuplexStream,
  ChannelError, DpskModem, ModemConfig,
};
use clap::{Parser, Subcommand};
use crossbeam_channel::{unbounded, Receiver};
use multiple_access::{Address, DeliveryError, Inbound, MacConfig, MacEngine};

/// Ping another Athernet node, and answer its pings
#[derive(Parser)]
struct AnetPing {
  #[command(subcommand)]
  medium: Channel,

  /// MAC address of this node
  #[arg(long, default_value_t = 1)]
  address: u8,

  /// MAC address of the node to ping
  #[arg(long, default_value_t = 2)]
  peer: u8,

  /// number of ping rounds, 0 to only answer
  #[arg(long, default_value_t = 10)]
  rounds: u32,

  /// PONG wait in milliseconds
  #[arg(long, default_value_t = MacConfig::PING_TIMEOUT.as_millis() as u64)]
  timeout: u64,

  /// also send this text to the peer after the pings
  #[arg(long)]
  message: Option<String>,
}

#[derive(Subcommand, Clone)]
enum Channel {
  /// Both nodes in this process, on a simulated medium
  Local {
    /// amplitude of the noise added by the medium
    #[arg(long, default_value_t = 0.0)]
    noise: f32,
  },
  /// Samples tunneled over UDP to the peer process
  Udp {
    /// local socket address
    local: SocketAddr,
    /// socket address of the peer process
    remote: SocketAddr,
  },
  /// The default audio devices
  #[cfg(feature = "audio")]
  Audio,
}

fn start<S>(address: u8, stream: S, modem: &Arc<DpskModem>) -> Result<(MacEngine, Receiver<Inbound>), DeliveryError>
where
  S: DuplexStream<f32, ChannelError>,
{
  let (inbound_tx, inbound_rx) = unbounded();
  let engine = MacEngine::start(
    Address(address),
    modem.clone(),
    stream,
    MacConfig::default(),
    inbound_tx,
  )?;
  Ok((engine, inbound_rx))
}

/// print what the node is told
fn report(inbound: Receiver<Inbound>) {
  thread::spawn(move || {
    for msg in inbound {
      match msg {
        Inbound::Data { src, payload } => {
          println!("DATA from {src}: {:?}", String::from_utf8_lossy(&payload))
        }
        Inbound::Delivery { dest, outcome } => println!("SEND to {dest}: {outcome:?}"),
      }
    }
  });
}

fn ping(engine: &MacEngine, peer: Address, rounds: u32, timeout: Duration) {
  println!("PING {peer} from {}", engine.address());
  let mut received = 0;
  let mut total = Duration::ZERO;
  for seq in 0..rounds {
    let start = Instant::now();
    match engine.ping(peer, timeout) {
      Ok(reply) => {
        received += 1;
        total += reply.rtt;
        println!("PONG(seq={seq}) from {} RTT={}ms", reply.from, reply.rtt.as_millis());
      }
      Err(err) => println!("PING(seq={seq}) failed: {err}"),
    }
    // one round per second at most
    thread::sleep(Duration::from_secs(1).saturating_sub(start.elapsed()));
  }
  if received > 0 {
    println!(
      "{received}/{rounds} replies, average RTT={}ms",
      (total / received).as_millis()
    );
  } else {
    println!("0/{rounds} replies");
  }
}

fn main() -> Result<(), DeliveryError> {
  env_logger::init();

  let AnetPing {
    medium,
    address,
    peer,
    rounds,
    timeout,
    message,
  } = AnetPing::parse();
  let peer = Address(peer);
  let timeout = Duration::from_millis(timeout);
  let modem = Arc::new(DpskModem::new(ModemConfig::default())?);

  // the peer engine of the local medium lives as long as this one
  let (engine, inbound, _peer) = match medium {
    Channel::Local { noise } => {
      let medium = Medium::with_noise(noise);
      let (engine, inbound) = start(address, medium.attach(), &modem)?;
      let (peer_engine, peer_inbound) = start(peer.0, medium.attach(), &modem)?;
      report(peer_inbound);
      (engine, inbound, Some(peer_engine))
    }
    Channel::Udp { local, remote } => {
      let (engine, inbound) = start(address, UdpStream::new(local, remote)?, &modem)?;
      (engine, inbound, None)
    }
    #[cfg(feature = "audio")]
    Channel::Audio => {
      let stream = acoustic_link::sample_stream::CpalStream::open(modem.config())?;
      let (engine, inbound) = start(address, stream, &modem)?;
      (engine, inbound, None)
    }
  };
  report(inbound);

  if rounds == 0 {
    println!("node {} answering, Ctrl-C to quit", engine.address());
    loop {
      thread::park();
    }
  }
  ping(&engine, peer, rounds, timeout);
  if let Some(message) = message {
    engine.send(peer, message.as_bytes())?;
    // let the peer print it
    thread::sleep(Duration::from_millis(200));
  }
  engine.stop();
  Ok(())
}
