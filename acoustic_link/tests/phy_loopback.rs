use std::{
  sync::Arc,
  thread,
  time::{Duration, Instant},
};

use acoustic_link::{
  phy_packet::{PhyDecoder, PhyEncoder, PhyReceiver, PhySender},
  sample_stream::{LoopBackStream, Medium, UdpStream},
  traits::DuplexStream,
  DpskModem, ModemConfig, PhyError,
};
use rand::{distributions::Standard, Rng};

fn random_frames(n: usize, max_len: usize) -> Vec<Vec<u8>> {
  let mut rng = rand::thread_rng();
  (0..n)
    .map(|_| {
      let len = rng.gen_range(1..=max_len);
      (&mut rng).sample_iter(Standard).take(len).collect()
    })
    .collect()
}

/// poll the receiver until `n` packets arrive or the time runs out
fn collect<SS>(receiver: &mut PhyReceiver<SS>, n: usize, timeout: Duration) -> Vec<Vec<u8>>
where
  SS: acoustic_link::traits::InStream<f32, acoustic_link::ChannelError>,
{
  let mut packets = Vec::new();
  let start = Instant::now();
  while packets.len() < n && start.elapsed() < timeout {
    receiver.poll(&mut packets).unwrap();
  }
  packets
}

fn modem() -> Arc<DpskModem> {
  Arc::new(DpskModem::new(ModemConfig::default()).unwrap())
}

#[test]
fn loopback_packets_in_order() {
  let _ = env_logger::builder().is_test(true).try_init();
  let modem = modem();
  let (source, sink) = LoopBackStream::new().split();
  let mut sender = PhySender::new(sink, PhyEncoder::new(modem.clone()));
  let mut receiver = PhyReceiver::new(source, PhyDecoder::new(modem));

  let frames = random_frames(20, ModemConfig::FRAME_BYTES);
  frames.iter().for_each(|frame| sender.send(frame).unwrap());

  let packets = collect(&mut receiver, frames.len(), Duration::from_secs(10));
  assert_eq!(packets, frames);
  assert_eq!(receiver.decoder().stats().corrupt, 0);
}

#[test]
fn oversized_frame_rejected() {
  let modem = modem();
  let (_, sink) = LoopBackStream::new().split();
  let mut sender = PhySender::new(sink, PhyEncoder::new(modem));
  assert!(matches!(
    sender.send(&[0; ModemConfig::FRAME_BYTES + 1]),
    Err(PhyError::Modem(_))
  ));
}

/// a writer thread and a reader thread on a noisy shared medium
#[test]
fn noisy_medium_across_threads() {
  let _ = env_logger::builder().is_test(true).try_init();
  let modem = modem();
  let medium = Medium::with_noise(0.2);
  let (_, sink) = medium.attach().split();
  let (source, _) = medium.attach().split();
  let mut receiver = PhyReceiver::new(source, PhyDecoder::new(modem.clone()));

  let frames = random_frames(10, 64);
  let expected = frames.clone();
  let writer = thread::spawn(move || {
    let mut sender = PhySender::new(sink, PhyEncoder::new(modem));
    for frame in frames {
      sender.send(&frame).unwrap();
      thread::sleep(Duration::from_millis(5));
    }
  });

  let packets = collect(&mut receiver, expected.len(), Duration::from_secs(10));
  writer.join().unwrap();
  assert_eq!(packets, expected);
}

#[test]
fn udp_tunnel() {
  let modem = modem();
  let rx = UdpStream::new("127.0.0.1:0".parse().unwrap(), "127.0.0.1:9".parse().unwrap()).unwrap();
  let rx_addr = rx.local_addr().unwrap();
  let tx = UdpStream::new("127.0.0.1:0".parse().unwrap(), rx_addr).unwrap();
  let (source, _) = rx.split();
  let (_, sink) = tx.split();
  let mut receiver = PhyReceiver::new(source, PhyDecoder::new(modem.clone()));
  let mut sender = PhySender::new(sink, PhyEncoder::new(modem));

  // pace the datagrams, a burst of datagrams may overflow the socket buffer
  let frames = random_frames(3, 32);
  let mut packets = Vec::new();
  for frame in &frames {
    sender.send(frame).unwrap();
    packets.extend(collect(&mut receiver, 1, Duration::from_secs(5)));
  }
  assert_eq!(packets, frames);
}
