mod dpsk;
pub use dpsk::DpskModem;

#[cfg(test)]
mod tests;
