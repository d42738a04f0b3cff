use memory_probe::ByteRange;

use crate::Error;

/// A 16-byte decimal value, stored as two 64-bit little-endian words.
/// Displayed as its raw words; rendering the decimal digits belongs
/// to the inspected server's own formatting code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decimal128 {
    low64: u64,
    high64: u64,
}

impl Decimal128 {
    pub const SIZE: usize = 16;

    pub fn new(low64: u64, high64: u64) -> Self {
        Self { low64, high64 }
    }

    pub fn unpack_from(view: ByteRange) -> Result<Self, Error> {
        Ok(Self {
            low64: view.get_u64(0)?,
            high64: view.get_u64(8)?,
        })
    }

    pub fn low64(&self) -> u64 {
        self.low64
    }

    pub fn high64(&self) -> u64 {
        self.high64
    }
}

impl std::fmt::Display for Decimal128 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Decimal128(0x{:016x}{:016x})", self.high64, self.low64)
    }
}
