use itertools::Itertools;
use memory_probe::ByteRange;

use crate::Error;

/// A 16-byte UUID, recognized inside binary fields by their subtype
/// byte and displayed in the usual hyphenated form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Uuid {
    bytes: [u8; Self::SIZE],
}

impl Uuid {
    pub const SIZE: usize = 16;

    /// The binary-data subtype byte marking a UUID payload.
    pub const BINARY_SUBTYPE: u8 = 0x04;

    pub fn new(bytes: [u8; Self::SIZE]) -> Self {
        Self { bytes }
    }

    pub fn unpack_from(view: ByteRange) -> Result<Self, Error> {
        let bytes = view
            .subrange(0..Self::SIZE)?
            .bytes()
            .try_into()
            .expect("subrange returned exact length");
        Ok(Self { bytes })
    }

    pub fn bytes(&self) -> &[u8; Self::SIZE] {
        &self.bytes
    }
}

impl std::fmt::Display for Uuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hex = |range: std::ops::Range<usize>| {
            self.bytes[range]
                .iter()
                .map(|byte| format!("{byte:02x}"))
                .join("")
        };
        write!(
            f,
            "UUID(\"{}-{}-{}-{}-{}\")",
            hex(0..4),
            hex(4..6),
            hex(6..8),
            hex(8..10),
            hex(10..16),
        )
    }
}
