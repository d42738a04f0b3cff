use memory_probe::ByteRange;

use crate::Error;

/// An 8-byte replication timestamp: a 32-bit ordinal followed by a
/// 32-bit seconds-since-epoch value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timestamp {
    ordinal: u32,
    seconds: u32,
}

impl Timestamp {
    pub const SIZE: usize = 8;

    pub fn new(seconds: u32, ordinal: u32) -> Self {
        Self { ordinal, seconds }
    }

    pub fn unpack_from(view: ByteRange) -> Result<Self, Error> {
        Ok(Self {
            ordinal: view.get_u32(0)?,
            seconds: view.get_u32(4)?,
        })
    }

    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Timestamp({}, {})", self.seconds, self.ordinal)
    }
}
