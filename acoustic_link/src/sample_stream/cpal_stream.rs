use std::{
  sync::{mpsc, Arc},
  thread::{self, JoinHandle},
};

use cpal::{
  traits::{DeviceTrait, HostTrait, StreamTrait},
  InputCallbackInfo, OutputCallbackInfo, Stream, StreamConfig,
};

use crate::{
  block_buffer::ConcurrentBuffer,
  config::ModemConfig,
  error::ChannelError,
  traits::{DuplexStream, InStream, OutStream},
};

use super::READ_WAIT;

fn device_error<E: std::fmt::Display>(err: E) -> ChannelError {
  ChannelError::Device(err.to_string())
}

/// Owns the thread holding the cpal streams, which can not leave the thread that built them.
/// The streams stop when the last half of a [`CpalStream`] is dropped.
struct DeviceThread {
  stop: Option<mpsc::Sender<()>>,
  worker: Option<JoinHandle<()>>,
}

impl Drop for DeviceThread {
  fn drop(&mut self) {
    // closing the channel wakes up the device thread
    self.stop.take();
    if let Some(worker) = self.worker.take() {
      if worker.join().is_err() {
        log::error!("audio device thread panicked");
      }
    }
  }
}

/// The default audio input and output devices as a duplex sample stream.
/// The microphone samples are buffered until read,
/// the speaker plays silence when nothing is written.
pub struct CpalStream {
  input: ConcurrentBuffer<f32>,
  output: ConcurrentBuffer<f32>,
  device: Arc<DeviceThread>,
}

impl CpalStream {
  /// open the default devices with the sample rate of `config`, mono
  pub fn open(config: &ModemConfig) -> Result<Self, ChannelError> {
    let stream_config: StreamConfig = config.into();
    let input = ConcurrentBuffer::new();
    let output = ConcurrentBuffer::new();
    let (ready_tx, ready_rx) = mpsc::channel();
    let (stop_tx, stop_rx) = mpsc::channel::<()>();

    let (mic, speaker) = (input.clone(), output.clone());
    let worker = thread::spawn(move || match Self::build(&stream_config, mic, speaker) {
      Ok(streams) => {
        let _ = ready_tx.send(Ok(()));
        // park until the stream is dropped
        let _ = stop_rx.recv();
        drop(streams);
      }
      Err(err) => {
        let _ = ready_tx.send(Err(err));
      }
    });
    let device = DeviceThread {
      stop: Some(stop_tx),
      worker: Some(worker),
    };
    ready_rx.recv().map_err(|_| ChannelError::Closed)??;
    log::debug!("audio device opened at {} Hz", config.sample_rate);

    Ok(Self {
      input,
      output,
      device: Arc::new(device),
    })
  }

  fn build(
    config: &StreamConfig,
    mic: ConcurrentBuffer<f32>,
    speaker: ConcurrentBuffer<f32>,
  ) -> Result<(Stream, Stream), ChannelError> {
    let host = cpal::default_host();
    let input_device = host
      .default_input_device()
      .ok_or_else(|| ChannelError::Device("no default input device available".into()))?;
    let output_device = host
      .default_output_device()
      .ok_or_else(|| ChannelError::Device("no default output device available".into()))?;

    let input_stream = input_device
      .build_input_stream(
        config,
        move |data: &[f32], _: &InputCallbackInfo| mic.push_slice(data),
        |err| log::error!("input stream error: {err}"),
        None,
      )
      .map_err(device_error)?;
    let output_stream = output_device
      .build_output_stream(
        config,
        move |data: &mut [f32], _: &OutputCallbackInfo| {
          let n = speaker.pop_slice(data);
          data[n..].iter_mut().for_each(|x| *x = 0.0);
        },
        |err| log::error!("output stream error: {err}"),
        None,
      )
      .map_err(device_error)?;

    input_stream.play().map_err(device_error)?;
    output_stream.play().map_err(device_error)?;
    Ok((input_stream, output_stream))
  }
}

/// microphone half of a [`CpalStream`]
pub struct CpalSource {
  buffer: ConcurrentBuffer<f32>,
  _device: Arc<DeviceThread>,
}

/// speaker half of a [`CpalStream`]
pub struct CpalSink {
  buffer: ConcurrentBuffer<f32>,
  _device: Arc<DeviceThread>,
}

impl DuplexStream<f32, ChannelError> for CpalStream {
  type Source = CpalSource;
  type Sink = CpalSink;

  fn split(self) -> (Self::Source, Self::Sink) {
    let source = CpalSource {
      buffer: self.input,
      _device: self.device.clone(),
    };
    let sink = CpalSink {
      buffer: self.output,
      _device: self.device,
    };
    (source, sink)
  }
}

impl InStream<f32, ChannelError> for CpalSource {
  fn read(&mut self, buf: &mut [f32]) -> Result<usize, ChannelError> {
    Ok(self.buffer.pop_slice_timeout(buf, READ_WAIT))
  }
}

impl OutStream<f32, ChannelError> for CpalSink {
  fn write(&mut self, buf: &[f32]) -> Result<(), ChannelError> {
    self.buffer.push_slice(buf);
    Ok(())
  }
}
