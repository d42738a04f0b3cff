use std::ops::Range;

use crate::{Error, NormalizeOffset, NormalizeRange, Pointer, UnpackedValue};

/// A borrowed window of bytes read out of the inspected process,
/// tagged with the address its first byte was read from.
///
/// All accessors are bounds-checked and return errors rather than
/// panicking.  The window frequently holds corrupted or misidentified
/// process memory, and a malformed length field must not be able to
/// take down the session inspecting it.
#[derive(Clone, Copy)]
pub struct ByteRange<'a> {
    pub(crate) start: Pointer,
    pub(crate) bytes: &'a [u8],
}

pub trait UnpackBytes<'a>: Sized {
    fn unpack(bytes: ByteRange<'a>) -> Result<Self, Error>;
}

impl<'a> ByteRange<'a> {
    pub fn new(start: Pointer, bytes: &'a [u8]) -> Self {
        Self { start, bytes }
    }

    pub fn start(&self) -> Pointer {
        self.start
    }

    pub fn end(&self) -> Pointer {
        self.start + self.bytes.len()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn ptr_range(&self) -> Range<Pointer> {
        self.start..self.end()
    }

    pub fn address_range(&self, range: impl NormalizeRange) -> Range<Pointer> {
        range.as_ptr_range(self.ptr_range())
    }

    pub fn subrange(&self, range: impl NormalizeRange) -> Result<Self, Error> {
        let range = range.as_offset_range(self.ptr_range());
        if range.start > range.end || range.end > self.bytes.len() {
            return Err(Error::UnexpectedEndOfBuffer {
                offset: range.start,
                expected: range.end.saturating_sub(range.start),
                available: self.bytes.len().saturating_sub(range.start),
            });
        }
        Ok(Self {
            start: self.start + range.start,
            bytes: &self.bytes[range],
        })
    }

    pub fn unpack<T>(&self) -> Result<T, Error>
    where
        T: UnpackBytes<'a>,
    {
        T::unpack(*self)
    }

    fn get_array<const N: usize>(
        &self,
        loc: impl NormalizeOffset,
    ) -> Result<[u8; N], Error> {
        let offset = loc.as_offset(self.start);
        self.bytes
            .get(offset..)
            .and_then(|rest| rest.get(..N))
            .map(|window| {
                window.try_into().expect("slice indexed to exact length")
            })
            .ok_or(Error::UnexpectedEndOfBuffer {
                offset,
                expected: N,
                available: self.bytes.len().saturating_sub(offset),
            })
    }

    pub fn get_u8(&self, loc: impl NormalizeOffset) -> Result<u8, Error> {
        Ok(u8::from_le_bytes(self.get_array(loc)?))
    }

    pub fn get_u32(&self, loc: impl NormalizeOffset) -> Result<u32, Error> {
        Ok(u32::from_le_bytes(self.get_array(loc)?))
    }

    pub fn get_u64(&self, loc: impl NormalizeOffset) -> Result<u64, Error> {
        Ok(u64::from_le_bytes(self.get_array(loc)?))
    }

    pub fn get_i32(&self, loc: impl NormalizeOffset) -> Result<i32, Error> {
        Ok(i32::from_le_bytes(self.get_array(loc)?))
    }

    pub fn get_i64(&self, loc: impl NormalizeOffset) -> Result<i64, Error> {
        Ok(i64::from_le_bytes(self.get_array(loc)?))
    }

    pub fn get_f64(&self, loc: impl NormalizeOffset) -> Result<f64, Error> {
        Ok(f64::from_le_bytes(self.get_array(loc)?))
    }

    pub fn get_pointer(
        &self,
        loc: impl NormalizeOffset,
    ) -> Result<Pointer, Error> {
        let arr: [u8; 8] = self.get_array(loc)?;
        Ok(arr.into())
    }

    /// Read a null-terminated string starting at the given location.
    /// The search for the terminator never leaves the window, and the
    /// returned location covers the string contents without the NUL.
    pub fn get_null_terminated(
        &self,
        loc: impl NormalizeOffset,
    ) -> Result<UnpackedValue<&'a str>, Error> {
        let offset = loc.as_offset(self.start);
        let remaining =
            self.bytes.get(offset..).ok_or(Error::UnexpectedEndOfBuffer {
                offset,
                expected: 1,
                available: 0,
            })?;
        let size = remaining
            .iter()
            .position(|byte| *byte == 0)
            .ok_or(Error::MissingNullTerminator(remaining.len()))?;
        let value = std::str::from_utf8(&remaining[..size])?;
        let loc = self.address_range(offset..offset + size);
        Ok(UnpackedValue::new(loc, value))
    }
}

impl<'a> From<ByteRange<'a>> for Range<Pointer> {
    fn from(val: ByteRange<'a>) -> Self {
        val.ptr_range()
    }
}

impl<'a> From<ByteRange<'a>> for &'a [u8] {
    fn from(val: ByteRange<'a>) -> Self {
        val.bytes
    }
}

macro_rules! unpack_le_prim {
    ($prim:ident) => {
        impl<'a> UnpackBytes<'a> for $prim {
            fn unpack(bytes: ByteRange<'a>) -> Result<Self, Error> {
                let arr = bytes.bytes.try_into().map_err(|_| {
                    Error::UnexpectedEndOfBuffer {
                        offset: 0,
                        expected: std::mem::size_of::<$prim>(),
                        available: bytes.len(),
                    }
                })?;
                Ok($prim::from_le_bytes(arr))
            }
        }
    };
}

unpack_le_prim! {u8}
unpack_le_prim! {u16}
unpack_le_prim! {u32}
unpack_le_prim! {u64}
unpack_le_prim! {u128}
unpack_le_prim! {i32}
unpack_le_prim! {i64}
unpack_le_prim! {f64}

impl<'a> UnpackBytes<'a> for bool {
    fn unpack(bytes: ByteRange<'a>) -> Result<Self, Error> {
        let byte: u8 = bytes.unpack()?;
        Ok(byte > 0)
    }
}

impl<'a> UnpackBytes<'a> for Pointer {
    fn unpack(bytes: ByteRange<'a>) -> Result<Self, Error> {
        let arr: [u8; Pointer::SIZE] =
            bytes.bytes.try_into().map_err(|_| {
                Error::UnexpectedEndOfBuffer {
                    offset: 0,
                    expected: Pointer::SIZE,
                    available: bytes.len(),
                }
            })?;
        Ok(arr.into())
    }
}
