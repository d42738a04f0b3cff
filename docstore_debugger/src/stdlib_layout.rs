use memory_probe::{MemorySource, Pointer};

use crate::Error;

/// Raw decoders for the libstdc++ in-memory layouts of the inspected
/// server's standard-library members.  The auxiliary registries
/// (resource catalogs, label vectors, thread tables) store their
/// contents in `std::string` and `std::vector`, so reconstructing
/// them means walking those layouts by hand.

/// `std::string`: a data pointer, a size, and a union of capacity and
/// small-string buffer.  Short strings point into the object itself,
/// which makes no difference here since the data pointer is followed
/// through target memory either way.
pub struct CxxString;

impl CxxString {
    pub const SIZE: usize = 32;

    /// Strings in the registries are namespace names and labels;
    /// anything claiming to be longer than this is corruption.
    const MAX_PLAUSIBLE_LEN: usize = 1 << 20;

    pub fn read(
        ptr: Pointer,
        source: &dyn MemorySource,
    ) -> Result<String, Error> {
        let header = source.read_memory(ptr..ptr.try_add(16)?)?;
        let data: Pointer = header.subrange(0..8)?.unpack()?;
        let size = header.subrange(8..16)?.unpack::<u64>()? as usize;

        if size > Self::MAX_PLAUSIBLE_LEN {
            return Err(Error::CorruptStdString { ptr, size });
        }
        if size == 0 {
            return Ok(String::new());
        }

        let bytes = source.read_memory(data..data.try_add(size)?)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// `std::vector`: begin, end, and end-of-capacity pointers.  Element
/// interpretation is up to the caller; this only recovers the extent.
pub struct CxxVector {
    begin: Pointer,
    end: Pointer,
}

impl CxxVector {
    pub const SIZE: usize = 24;

    /// The registries this decoder is pointed at hold at most a few
    /// thousand entries.
    const MAX_PLAUSIBLE_BYTES: usize = 1 << 24;

    pub fn read(
        ptr: Pointer,
        source: &dyn MemorySource,
    ) -> Result<Self, Error> {
        let header = source.read_memory(ptr..ptr.try_add(Self::SIZE)?)?;
        let begin: Pointer = header.subrange(0..8)?.unpack()?;
        let end: Pointer = header.subrange(8..16)?.unpack()?;

        let size_bytes = end.checked_diff(begin).ok_or_else(|| {
            Error::CorruptStdVector { ptr, count: 0 }
        })?;
        if size_bytes > Self::MAX_PLAUSIBLE_BYTES {
            return Err(Error::CorruptStdVector {
                ptr,
                count: size_bytes,
            });
        }

        Ok(Self { begin, end })
    }

    pub fn size_bytes(&self) -> usize {
        self.end - self.begin
    }

    pub fn num_elements(&self, stride: usize) -> usize {
        self.size_bytes() / stride
    }

    pub fn element_ptr(&self, index: usize, stride: usize) -> Pointer {
        self.begin + index * stride
    }

    pub fn iter_element_ptrs(
        &self,
        stride: usize,
    ) -> impl Iterator<Item = Pointer> + '_ {
        (0..self.num_elements(stride))
            .map(move |index| self.element_ptr(index, stride))
    }
}
