use crate::{
  error::ChannelError,
  traits::{DuplexStream, InStream, OutStream},
};

pub trait SampleInStream: InStream<f32, ChannelError> {}
impl<S> SampleInStream for S where S: InStream<f32, ChannelError> {}

pub trait SampleOutStream: OutStream<f32, ChannelError> {}
impl<S> SampleOutStream for S where S: OutStream<f32, ChannelError> {}

pub trait SampleDuplexStream: DuplexStream<f32, ChannelError> {}
impl<S> SampleDuplexStream for S where S: DuplexStream<f32, ChannelError> {}
