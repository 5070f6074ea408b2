/// Read continuously data of type `T` from [`InStream`].
/// Might encounter error of type `E`
pub trait InStream<T, E> {
  /// Read data to a slice, return the number of elements read.
  /// The function call should return instantly (or after a short bounded wait),
  /// do not wait for the slice to be filled.
  fn read(&mut self, buf: &mut [T]) -> Result<usize, E>;
}

/// Write data of type `T` continuously into [`OutStream`].
/// Might encounter error of type `E`
pub trait OutStream<T, E> {
  /// Enqueue all the data in the slice.
  /// The function call should not wait for the data to be played or flushed.
  fn write(&mut self, buf: &[T]) -> Result<(), E>;
}

/// A stream that can be read and written at the same time,
/// by splitting it into an input half and an output half.
/// The halves are handed to different threads.
pub trait DuplexStream<T, E> {
  type Source: InStream<T, E> + Send + 'static;
  type Sink: OutStream<T, E> + Send + 'static;

  fn split(self) -> (Self::Source, Self::Sink);
}
