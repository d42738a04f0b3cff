use memory_probe::ByteRange;

use crate::Error;

/// An 8-byte date value, signed milliseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateTime {
    millis: i64,
}

impl DateTime {
    pub const SIZE: usize = 8;

    pub fn new(millis: i64) -> Self {
        Self { millis }
    }

    pub fn unpack_from(view: ByteRange) -> Result<Self, Error> {
        Ok(Self {
            millis: view.get_i64(0)?,
        })
    }

    pub fn millis_since_epoch(&self) -> i64 {
        self.millis
    }
}

impl std::fmt::Display for DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Date({})", self.millis)
    }
}
