use std::cell::OnceCell;
use std::ops::Range;

use itertools::Itertools;
use nix::sys::uio::{process_vm_readv, RemoteIoVec};
use nix::unistd::Pid;

use crate::{
    ByteOrder, Error, MemoryMapRegion, MemorySource, OwnedBytes, Pointer,
    Result, Symbol,
};

/// Reads memory and symbols out of a live, stopped process.
pub struct ProcessReader {
    pid: u32,
    regions: Vec<MemoryMapRegion>,
    symbols: OnceCell<Vec<Symbol>>,
}

impl ProcessReader {
    pub fn new(pid: u32) -> Result<Self> {
        let regions = Self::get_memory_regions(pid)?;
        Ok(Self {
            pid,
            regions,
            symbols: OnceCell::new(),
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    fn get_memory_regions(pid: u32) -> Result<Vec<MemoryMapRegion>> {
        proc_maps::get_process_maps(
            pid.try_into().unwrap_or_else(|_| {
                panic!("Could not convert PID {pid} to pid_t")
            }),
        )
        .map_err(|_| Error::MemoryMapNotFound(pid))?
        .into_iter()
        .map(|map_range| MemoryMapRegion::new(map_range, pid))
        .collect()
    }

    pub fn iter_regions(&self) -> impl Iterator<Item = &MemoryMapRegion> + '_ {
        self.regions.iter()
    }

    pub fn find_region(
        &self,
        mut filter: impl FnMut(&MemoryMapRegion) -> bool,
    ) -> Option<&MemoryMapRegion> {
        self.iter_regions().find(|reg| filter(reg))
    }

    pub fn find_containing_region(
        &self,
        ptr: Pointer,
    ) -> Option<&MemoryMapRegion> {
        if ptr.is_null() {
            return None;
        }

        self.iter_regions().find(|region| region.contains(ptr))
    }

    pub fn is_valid_ptr(&self, ptr: Pointer) -> bool {
        self.find_containing_region(ptr).is_some()
    }

    pub fn read_exact(&self, ptr: Pointer, buffer: &mut [u8]) -> Result<()> {
        if ptr.is_null() {
            return Err(Error::MemoryReadNullPointer);
        }

        let buffer_len = buffer.len();
        let num_received = process_vm_readv(
            Pid::from_raw(self.pid as i32),
            &mut [std::io::IoSliceMut::new(buffer)],
            &[RemoteIoVec {
                base: ptr.as_usize(),
                len: buffer_len,
            }],
        )
        .map_err(|err| match err {
            nix::Error::EPERM => Error::MemoryReadInsufficientPermission,
            nix::Error::EFAULT => Error::MemoryReadBadAddress(ptr),
            err => Error::ProcessVM { err },
        })?;

        if num_received != buffer.len() {
            return Err(Error::IncompleteMemoryRead {
                start: ptr,
                num_requested: buffer.len(),
                num_received,
            });
        }

        Ok(())
    }

    /// Symbols of every file-backed mapping, harvested lazily on
    /// first use and held for the lifetime of the reader.
    pub fn symbols(&self) -> &[Symbol] {
        self.symbols.get_or_init(|| {
            self.iter_regions()
                .filter(|region| region.is_file_backed())
                .unique_by(|region| region.name().map(str::to_string))
                .flat_map(|region| region.iter_symbols())
                .collect()
        })
    }
}

impl MemorySource for ProcessReader {
    fn read_memory(&self, range: Range<Pointer>) -> Result<OwnedBytes> {
        let mut buffer = vec![0u8; range.end - range.start];
        self.read_exact(range.start, &mut buffer)?;
        Ok(OwnedBytes::new(range.start, buffer))
    }

    fn lookup_symbol(&self, name: &str) -> Option<Symbol> {
        self.symbols()
            .iter()
            .find(|symbol| symbol.matches(name))
            .cloned()
    }

    fn symbol_at(&self, location: Pointer) -> Option<String> {
        self.symbols()
            .iter()
            .find(|symbol| symbol.contains(location))
            .map(|symbol| symbol.demangled())
    }

    fn byte_order(&self) -> ByteOrder {
        // process_vm_readv only works against processes on the same
        // machine, so the inspected process shares our byte order.
        ByteOrder::native()
    }
}
