mod bytes_bits;
pub use bytes_bits::{bits_to_bytes, bytes_to_bits, msb_mask};

mod signal;
pub use signal::{add_noise, chirp, copy, dot_product, energy};
