use std::ops::Range;

use crate::{Error, OwnedBytes, Pointer, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }
}

/// The seam between the decoders and whatever is supplying the
/// inspected process's memory: a live process, or a reassembled
/// snapshot of one.
///
/// Decoders never write to inspected memory, so the trait is
/// read-only by construction.
pub trait MemorySource {
    /// Read the exact byte range out of the inspected process.  The
    /// inspected process is stopped, so reads are blocking calls that
    /// return immediately.
    fn read_memory(&self, range: Range<Pointer>) -> Result<OwnedBytes, Error>;

    /// Look up a symbol by name.  Mangled C++ names are matched both
    /// in their raw and demangled spellings.
    fn lookup_symbol(&self, name: &str) -> Option<Symbol>;

    /// Reverse lookup: the demangled name of the symbol whose extent
    /// contains the given address, if any.
    fn symbol_at(&self, location: Pointer) -> Option<String>;

    /// Byte order of the inspected process.
    fn byte_order(&self) -> ByteOrder {
        ByteOrder::Little
    }
}

/// Typed convenience reads on top of the object-safe `MemorySource`.
pub trait MemorySourceExt: MemorySource {
    fn read_byte_array<const N: usize>(
        &self,
        ptr: Pointer,
    ) -> Result<[u8; N], Error> {
        let bytes = self.read_memory(ptr..ptr.try_add(N)?)?;
        bytes.as_slice().try_into().map_err(|_| {
            Error::IncompleteMemoryRead {
                start: ptr,
                num_requested: N,
                num_received: bytes.len(),
            }
        })
    }

    fn read_pointer(&self, ptr: Pointer) -> Result<Pointer, Error> {
        let arr: [u8; 8] = self.read_byte_array(ptr)?;
        Ok(arr.into())
    }

    fn read_u32(&self, ptr: Pointer) -> Result<u32, Error> {
        Ok(u32::from_le_bytes(self.read_byte_array(ptr)?))
    }

    fn read_u64(&self, ptr: Pointer) -> Result<u64, Error> {
        Ok(u64::from_le_bytes(self.read_byte_array(ptr)?))
    }

    fn read_i32(&self, ptr: Pointer) -> Result<i32, Error> {
        Ok(i32::from_le_bytes(self.read_byte_array(ptr)?))
    }
}

impl<T: MemorySource + ?Sized> MemorySourceExt for T {}
