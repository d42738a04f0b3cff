use std::ops::{Deref, Range};

use crate::{ByteRange, Error, NormalizeRange, Pointer};

/// Owning equivalent of [`ByteRange`].  Produced by memory reads and
/// sliceable back into borrowed windows.
#[derive(Clone)]
pub struct OwnedBytes {
    start: Pointer,
    bytes: Vec<u8>,
}

impl OwnedBytes {
    pub fn new(start: Pointer, bytes: Vec<u8>) -> Self {
        Self { start, bytes }
    }

    pub fn start(&self) -> Pointer {
        self.start
    }

    pub fn end(&self) -> Pointer {
        self.start + self.bytes.len()
    }

    pub fn ptr_range(&self) -> Range<Pointer> {
        self.start..self.end()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_range(&self) -> ByteRange<'_> {
        self.into()
    }

    pub fn subrange(
        &self,
        range: impl NormalizeRange,
    ) -> Result<ByteRange<'_>, Error> {
        self.as_range().subrange(range)
    }

    pub fn take(self) -> Vec<u8> {
        self.bytes
    }
}

impl IntoIterator for OwnedBytes {
    type Item = <Vec<u8> as IntoIterator>::Item;
    type IntoIter = <Vec<u8> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.bytes.into_iter()
    }
}

impl<'a> From<&'a OwnedBytes> for ByteRange<'a> {
    fn from(val: &'a OwnedBytes) -> Self {
        ByteRange::new(val.start, &val.bytes)
    }
}

impl From<&OwnedBytes> for Range<Pointer> {
    fn from(val: &OwnedBytes) -> Self {
        val.ptr_range()
    }
}

impl Deref for OwnedBytes {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.bytes
    }
}
