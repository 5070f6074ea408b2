mod stream;
pub use stream::{DuplexStream, InStream, OutStream};
