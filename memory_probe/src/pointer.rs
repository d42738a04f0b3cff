use std::fmt::{Debug, Display};

use crate::Error;

/// An address in the inspected process.  Never dereferenced locally;
/// all reads go through a `MemorySource`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pointer {
    pub(crate) address: usize,
}

impl std::cmp::PartialOrd for Pointer {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.address.cmp(&other.address))
    }
}

impl std::cmp::Ord for Pointer {
    #[inline]
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.address.cmp(&other.address)
    }
}

impl Pointer {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    #[inline]
    pub fn new(address: impl Into<Self>) -> Self {
        address.into()
    }

    #[inline]
    pub fn as_usize(self) -> usize {
        self.address
    }

    #[inline]
    pub fn null() -> Self {
        Self { address: 0 }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.address == 0
    }

    #[inline]
    pub fn as_non_null(self) -> Option<Self> {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
    }

    #[inline]
    pub fn is_aligned(&self, alignment: usize) -> bool {
        self.address % alignment == 0
    }

    #[inline]
    pub fn try_add(self, offset: usize) -> Result<Self, Error> {
        self.checked_add(offset)
            .ok_or(Error::PointerOverflow(self, offset))
    }

    #[inline]
    pub fn checked_add(self, offset: usize) -> Option<Self> {
        self.address
            .checked_add(offset)
            .map(|address| Self { address })
    }

    #[inline]
    pub fn checked_sub(self, offset: usize) -> Option<Self> {
        self.address
            .checked_sub(offset)
            .map(|address| Self { address })
    }

    #[inline]
    pub fn checked_diff(self, other: Pointer) -> Option<usize> {
        self.address.checked_sub(other.address)
    }
}

impl std::ops::Add<usize> for Pointer {
    type Output = Pointer;

    #[inline]
    fn add(self, rhs: usize) -> Self::Output {
        self.checked_add(rhs).unwrap()
    }
}

impl std::ops::Sub<usize> for Pointer {
    type Output = Pointer;

    #[inline]
    fn sub(self, rhs: usize) -> Self::Output {
        self.checked_sub(rhs).unwrap()
    }
}

impl std::ops::Sub for Pointer {
    type Output = usize;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        self.address - rhs.address
    }
}

/// Flags are sometimes stored in the low bits of pointers.  This
/// overload exists to allow them to be masked out.
impl std::ops::BitAnd<usize> for Pointer {
    type Output = Pointer;

    fn bitand(self, mask: usize) -> Self::Output {
        (self.address & mask).into()
    }
}

impl Debug for Pointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pointer(0x{:016x})", self.address)
    }
}

impl Display for Pointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:016x}", self.address)
    }
}

impl From<usize> for Pointer {
    #[inline]
    fn from(address: usize) -> Self {
        Self { address }
    }
}

impl From<[u8; 8]> for Pointer {
    #[inline]
    fn from(bytes: [u8; 8]) -> Self {
        let address = u64::from_le_bytes(bytes) as usize;
        Self { address }
    }
}

impl TryFrom<&[u8]> for Pointer {
    type Error = std::array::TryFromSliceError;

    #[inline]
    fn try_from(bytes: &[u8]) -> std::result::Result<Self, Self::Error> {
        let arr: [u8; 8] = bytes.try_into()?;
        Ok(arr.into())
    }
}
