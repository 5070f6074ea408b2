use bitvec::prelude::*;

/// The highest set bit of `x` as a single-bit mask, e.g. `0b0110 -> 0b0100`.
///
/// **Precondition**: `x > 0`. The result for zero is meaningless (zero in release builds).
pub const fn msb_mask(x: u32) -> u32 {
  debug_assert!(x > 0);
  if x == 0 {
    0
  } else {
    1 << (u32::BITS - 1 - x.leading_zeros())
  }
}

/// bytes to bits, least significant bit of each byte first.
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
  bytes.view_bits::<Lsb0>().iter().map(|bit| *bit as u8).collect()
}

/// the reverse process of [`bytes_to_bits`].
/// A trailing group of less than 8 bits is dropped.
pub fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
  let mut buf: BitVec<u8, Lsb0> = BitVec::with_capacity(bits.len());
  bits.iter().take(bits.len() / 8 * 8).for_each(|&bit| buf.push(bit != 0));
  buf.into_vec()
}
