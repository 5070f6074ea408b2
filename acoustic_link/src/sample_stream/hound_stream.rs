use std::{
  fs::File,
  io::{BufReader, BufWriter, Read, Seek, Write},
  path::Path,
};

use hound::{WavReader, WavWriter};

use crate::{
  config::ModemConfig,
  error::ChannelError,
  traits::{InStream, OutStream},
};

/// Samples read from a WAV file, `read` returns 0 at the end of the file.
pub struct HoundInStream<R: Read>(WavReader<R>);

/// Samples written into a WAV file. Call [`HoundOutStream::finalize`] to update the header.
pub struct HoundOutStream<W: Write + Seek>(WavWriter<W>);

impl<R: Read> HoundInStream<R> {
  pub fn new(wav_reader: WavReader<R>) -> Self {
    Self(wav_reader)
  }

  /// samples left in the file
  pub fn remaining(&self) -> usize {
    self.0.len() as usize
  }
}

impl HoundInStream<BufReader<File>> {
  pub fn open<P: AsRef<Path>>(filename: P) -> Result<Self, ChannelError> {
    Ok(Self::new(WavReader::open(filename)?))
  }
}

impl<W: Write + Seek> HoundOutStream<W> {
  pub fn new(wav_writer: WavWriter<W>) -> Self {
    Self(wav_writer)
  }

  pub fn finalize(self) -> Result<(), ChannelError> {
    Ok(self.0.finalize()?)
  }
}

impl HoundOutStream<BufWriter<File>> {
  /// Create a mono 32 bit float WAV file at the sample rate of `config`.
  pub fn create<P: AsRef<Path>>(filename: P, config: &ModemConfig) -> Result<Self, ChannelError> {
    Ok(Self::new(WavWriter::create(filename, config.into())?))
  }
}

impl<R: Read> InStream<f32, ChannelError> for HoundInStream<R> {
  fn read(&mut self, buf: &mut [f32]) -> Result<usize, ChannelError> {
    let mut n = 0;
    for (x, sample) in buf.iter_mut().zip(self.0.samples::<f32>()) {
      *x = sample?;
      n += 1;
    }
    Ok(n)
  }
}

impl<W: Write + Seek> OutStream<f32, ChannelError> for HoundOutStream<W> {
  fn write(&mut self, buf: &[f32]) -> Result<(), ChannelError> {
    for &x in buf {
      self.0.write_sample(x)?;
    }
    Ok(())
  }
}
