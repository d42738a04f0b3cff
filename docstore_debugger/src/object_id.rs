use itertools::Itertools;
use memory_probe::ByteRange;

use crate::Error;

/// A 12-byte object identifier, stored and displayed as raw bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectId {
    bytes: [u8; Self::SIZE],
}

impl ObjectId {
    pub const SIZE: usize = 12;

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

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ObjectId(\"{}\")",
            self.bytes
                .iter()
                .format_with("", |byte, f| f(&format_args!("{byte:02x}")))
        )
    }
}
