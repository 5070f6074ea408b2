use std::sync::Arc;

use crc::{Crc, CRC_8_SMBUS};

use super::{frame_detect::CorrelationFraming, modem::DpskModem, FrameDetector, PhyPacket};
use crate::{
  config::ModemConfig,
  error::{ChannelError, ModemError, PhyError},
  traits::{InStream, OutStream},
};

/// bytes added to a frame by [`pack`]: the length field and the checksum
pub const PHY_OVERHEAD: usize = 2;

const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// PHY packet = `[len][frame][crc8]`, where `crc8` covers the length field and the frame.
/// The frame must be shorter than 256 bytes.
pub fn pack(frame: &[u8]) -> PhyPacket {
  debug_assert!(frame.len() <= u8::MAX as usize);
  let mut packet = Vec::with_capacity(frame.len() + PHY_OVERHEAD);
  packet.push(frame.len() as u8);
  packet.extend_from_slice(frame);
  packet.push(CRC8.checksum(&packet));
  packet
}

/// the reverse process of [`pack`].
/// Return [`None`] if the length field or the checksum does not match.
pub fn unpack(packet: &[u8]) -> Option<&[u8]> {
  let (&crc, body) = packet.split_last()?;
  let (&len, frame) = body.split_first()?;
  if len as usize != frame.len() || CRC8.checksum(body) != crc {
    return None;
  }
  Some(frame)
}

/// Turn frames into transmission bursts: modulated PHY packet followed by guard silence.
#[derive(Debug, Clone)]
pub struct PhyEncoder {
  modem: Arc<DpskModem>,
}

impl PhyEncoder {
  pub fn new(modem: Arc<DpskModem>) -> Self {
    Self { modem }
  }

  pub fn modem(&self) -> &DpskModem {
    &self.modem
  }

  /// number of samples in the burst of a `frame_len` bytes frame
  pub fn burst_len(&self, frame_len: usize) -> usize {
    self.modem.samples_for(frame_len + PHY_OVERHEAD) + self.modem.config().guard_samples
  }

  pub fn encode(&self, frame: &[u8]) -> Result<Vec<f32>, ModemError> {
    let max = self.modem.config().frame_bytes;
    if frame.len() > max {
      return Err(ModemError::PayloadTooLarge { len: frame.len(), max });
    }
    let mut samples = self.modem.render(&pack(frame));
    samples.resize(samples.len() + self.modem.config().guard_samples, 0.0);
    Ok(samples)
  }
}

/// A send only PHY layer object, writes one burst per frame into the output stream.
pub struct PhySender<SS> {
  encoder: PhyEncoder,
  stream_out: SS,
}

impl<SS> PhySender<SS>
where
  SS: OutStream<f32, ChannelError>,
{
  pub fn new(stream_out: SS, encoder: PhyEncoder) -> Self {
    Self { encoder, stream_out }
  }

  pub fn encoder(&self) -> &PhyEncoder {
    &self.encoder
  }

  /// modulate the frame and write the burst to the underlying stream at once
  pub fn send(&mut self, frame: &[u8]) -> Result<(), PhyError> {
    let samples = self.encoder.encode(frame)?;
    self.stream_out.write(&samples)?;
    Ok(())
  }
}

enum DecodeState {
  /// looking for a preamble
  Detect,
  /// collecting the reference symbol and the length field
  Header,
  /// collecting the whole packet, `len` is the frame length
  Body { len: usize },
}

/// Counters of a [`PhyDecoder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhyStats {
  /// packets with a valid length and checksum
  pub packets: u64,
  /// packets dropped for a bad length field or checksum
  pub corrupt: u64,
}

/// Streaming PHY packet decoder, fed one sample at a time.
///
/// Detect the preamble with [`CorrelationFraming`], read the length field,
/// wait for the whole packet, then check the checksum.
/// Also track the signal power as an exponential moving average, which is used for carrier sense.
pub struct PhyDecoder {
  modem: Arc<DpskModem>,
  detector: CorrelationFraming,
  state: DecodeState,
  buf: Vec<f32>,
  power: f32,
  stats: PhyStats,
}

impl PhyDecoder {
  pub fn new(modem: Arc<DpskModem>) -> Self {
    let detector = CorrelationFraming::new(modem.chirp().to_vec(), modem.config().detect_threshold);
    Self {
      modem,
      detector,
      state: DecodeState::Detect,
      buf: Vec::new(),
      power: 0.0,
      stats: PhyStats::default(),
    }
  }

  /// moving average of the squared samples
  pub fn power(&self) -> f32 {
    self.power
  }

  pub fn stats(&self) -> PhyStats {
    self.stats
  }

  /// true while a packet is being collected
  pub fn in_frame(&self) -> bool {
    !matches!(self.state, DecodeState::Detect)
  }

  pub fn on_sample(&mut self, sample: f32) -> Option<PhyPacket> {
    self.power = self.power * 63.0 / 64.0 + sample * sample / 64.0;
    match self.state {
      DecodeState::Detect => {
        let after = self.detector.on_sample(sample)?;
        self.buf.clear();
        self.buf.extend(after);
        self.state = DecodeState::Header;
      }
      _ => self.buf.push(sample),
    }
    self.advance()
  }

  /// samples needed for the reference symbol and `bytes` bytes
  fn symbols_len(&self, bytes: usize) -> usize {
    self.modem.samples_per_symbol() * (1 + 8 * bytes)
  }

  fn advance(&mut self) -> Option<PhyPacket> {
    loop {
      match self.state {
        DecodeState::Detect => return None,
        DecodeState::Header => {
          let need = self.symbols_len(1);
          if self.buf.len() < need {
            return None;
          }
          let header = self.modem.decode_symbols(&self.buf[..need], 1);
          match header.first() {
            Some(&len) if len as usize <= self.modem.config().frame_bytes => {
              self.state = DecodeState::Body { len: len as usize };
            }
            _ => {
              log::trace!("bad length field {header:?}");
              self.drop_packet();
              return None;
            }
          }
        }
        DecodeState::Body { len } => {
          let need = self.symbols_len(len + PHY_OVERHEAD);
          if self.buf.len() < need {
            return None;
          }
          let packet = self.modem.decode_symbols(&self.buf[..need], len + PHY_OVERHEAD);
          let frame = unpack(&packet).map(|frame| frame.to_vec());
          self.restart();
          match frame {
            Some(frame) => {
              self.stats.packets += 1;
              return Some(frame);
            }
            None => {
              log::debug!("dropped a corrupt packet of {len} bytes");
              self.stats.corrupt += 1;
              return None;
            }
          }
        }
      }
    }
  }

  fn drop_packet(&mut self) {
    self.stats.corrupt += 1;
    self.restart();
  }

  fn restart(&mut self) {
    self.state = DecodeState::Detect;
    self.buf.clear();
    self.detector.reset();
  }
}

/// A receive only PHY layer object.
/// Pull samples from the input stream and decode PHY packets from them.
pub struct PhyReceiver<SS> {
  stream_in: SS,
  decoder: PhyDecoder,
  buf: Vec<f32>,
}

impl<SS> PhyReceiver<SS>
where
  SS: InStream<f32, ChannelError>,
{
  pub fn new(stream_in: SS, decoder: PhyDecoder) -> Self {
    Self {
      stream_in,
      decoder,
      buf: vec![0.0; ModemConfig::BUFFER_SIZE],
    }
  }

  pub fn decoder(&self) -> &PhyDecoder {
    &self.decoder
  }

  /// Read the samples available now, push the decoded packets into `packets`.
  /// Return the number of samples read.
  pub fn poll(&mut self, packets: &mut Vec<PhyPacket>) -> Result<usize, ChannelError> {
    let n = self.stream_in.read(&mut self.buf)?;
    let decoder = &mut self.decoder;
    packets.extend(self.buf[..n].iter().filter_map(|&x| decoder.on_sample(x)));
    Ok(n)
  }
}

#[cfg(test)]
mod tests {
  use super::{pack, unpack, PhyDecoder, PhyEncoder, PHY_OVERHEAD};
  use crate::{config::ModemConfig, error::ModemError, phy_packet::modem::DpskModem};
  use rand::{distributions::Standard, Rng};
  use std::sync::Arc;

  fn encoder_decoder(config: ModemConfig) -> (PhyEncoder, PhyDecoder) {
    let modem = Arc::new(DpskModem::new(config).unwrap());
    (PhyEncoder::new(modem.clone()), PhyDecoder::new(modem))
  }

  #[test]
  fn pack_layout() {
    let packet = pack(&[7, 8, 9]);
    assert_eq!(packet.len(), 3 + PHY_OVERHEAD);
    assert_eq!(&packet[..4], &[3, 7, 8, 9]);
    assert_eq!(unpack(&packet), Some(&[7u8, 8, 9][..]));
    assert_eq!(unpack(&pack(&[])), Some(&[][..]));
  }

  #[test]
  fn unpack_rejects_damage() {
    let packet = pack(&[1, 2, 3, 4]);
    for i in 0..packet.len() {
      let mut damaged = packet.clone();
      damaged[i] ^= 0x10;
      assert_eq!(unpack(&damaged), None);
    }
    assert_eq!(unpack(&packet[..packet.len() - 1]), None);
    assert_eq!(unpack(&[]), None);
    assert_eq!(unpack(&[0]), None);
  }

  #[test]
  fn encode_too_large() {
    let (encoder, _) = encoder_decoder(ModemConfig::with_frame_bytes(8));
    assert_eq!(
      encoder.encode(&[0; 9]),
      Err(ModemError::PayloadTooLarge { len: 9, max: 8 })
    );
    assert_eq!(encoder.encode(&[0; 8]).unwrap().len(), encoder.burst_len(8));
  }

  #[test]
  fn stream_decode() {
    let (encoder, mut decoder) = encoder_decoder(ModemConfig::default());
    let mut rng = rand::thread_rng();
    let frames: Vec<Vec<u8>> = (0..10)
      .map(|_| {
        let len = rng.gen_range(0..=ModemConfig::FRAME_BYTES);
        (&mut rng).sample_iter(Standard).take(len).collect()
      })
      .collect();

    let mut samples = vec![0.0; 1000];
    frames.iter().for_each(|frame| samples.extend(encoder.encode(frame).unwrap()));
    samples.extend(std::iter::repeat(0.0).take(1000));

    let decoded: Vec<Vec<u8>> = samples.iter().filter_map(|&x| decoder.on_sample(x)).collect();
    assert_eq!(decoded, frames);
    assert_eq!(decoder.stats().packets, frames.len() as u64);
    assert_eq!(decoder.stats().corrupt, 0);
    assert!(!decoder.in_frame());
  }

  #[test]
  fn truncated_burst_is_corrupt() {
    let (encoder, mut decoder) = encoder_decoder(ModemConfig::default());
    let burst = encoder.encode(&[0x5a; 100]).unwrap();
    let cut = burst.len() / 2;
    burst[..cut]
      .iter()
      .chain(std::iter::repeat(&0.0).take(burst.len()))
      .for_each(|&x| assert_eq!(decoder.on_sample(x), None));
    assert_eq!(decoder.stats().corrupt, 1);

    // the decoder recovers for the next packet
    let frame = [1, 2, 3];
    let decoded: Vec<_> = encoder
      .encode(&frame)
      .unwrap()
      .into_iter()
      .filter_map(|x| decoder.on_sample(x))
      .collect();
    assert_eq!(decoded, vec![frame.to_vec()]);
  }

  #[test]
  fn power_follows_signal() {
    let (encoder, mut decoder) = encoder_decoder(ModemConfig::default());
    assert_eq!(decoder.power(), 0.0);
    let burst = encoder.encode(&[0xff; 20]).unwrap();
    let guard = ModemConfig::GUARD_SAMPLES;
    burst[..burst.len() - guard].iter().for_each(|&x| {
      decoder.on_sample(x);
    });
    // a unit sine wave has power 0.5
    assert!(decoder.power() > 0.3);
    burst[burst.len() - guard..].iter().for_each(|&x| {
      decoder.on_sample(x);
    });
    assert!(decoder.power() < 1e-3);
  }
}
