use std::ops::Range;

use crate::{ByteRange, Error, Pointer, UnpackBytes};

/// A decoded value along with the address range it was decoded from.
#[derive(Clone, Copy)]
pub struct UnpackedValue<T> {
    /// Inclusive start of the value's location.  Not stored as a
    /// `Range<Pointer>`, because that would prevent `UnpackedValue`
    /// from implementing Copy.
    pub(crate) start: Pointer,

    /// Exclusive end of the value's location.
    pub(crate) end: Pointer,

    pub(crate) value: T,
}

impl<T> UnpackedValue<T> {
    pub fn new(loc: Range<Pointer>, value: T) -> Self {
        Self {
            start: loc.start,
            end: loc.end,
            value,
        }
    }

    pub fn map<U>(self, func: impl FnOnce(T) -> U) -> UnpackedValue<U> {
        UnpackedValue::new(self.loc(), func(self.value))
    }

    pub fn try_map<U, E>(
        self,
        func: impl FnOnce(T) -> Result<U, E>,
    ) -> Result<UnpackedValue<U>, E> {
        Ok(UnpackedValue::new(self.loc(), func(self.value)?))
    }

    pub fn loc(&self) -> Range<Pointer> {
        self.start..self.end
    }

    pub fn size_bytes(&self) -> usize {
        self.end - self.start
    }

    pub fn value(self) -> T {
        self.value
    }
}

impl<'a, T> UnpackBytes<'a> for UnpackedValue<T>
where
    T: UnpackBytes<'a>,
{
    fn unpack(bytes: ByteRange<'a>) -> Result<Self, Error> {
        Ok(UnpackedValue::new(bytes.into(), bytes.unpack()?))
    }
}
