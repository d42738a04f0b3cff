use std::path::Path;
use std::{fmt::Display, ops::Range};

use crate::{Error, Pointer, Result};

/// One entry of the inspected process's memory map, as reported by
/// /proc/PID/maps.  Metadata only; reads go through the process
/// reader.
#[derive(Debug, Clone)]
pub struct MemoryMapRegion {
    pid: u32,
    start: Pointer,
    end: Pointer,
    file_offset: usize,
    pub name: Option<String>,
    pub is_executable: bool,
    pub is_readable: bool,
    pub is_writable: bool,
    pub is_shared_memory: bool,
}

impl MemoryMapRegion {
    pub fn new(map_range: proc_maps::MapRange, pid: u32) -> Result<Self> {
        let name = map_range
            .filename()
            .map(|p| {
                p.to_str()
                    .ok_or(Error::InvalidUTF8InPath)
                    .map(|s| s.to_string())
            })
            .transpose()?;
        Ok(Self {
            pid,
            start: map_range.start().into(),
            end: (map_range.start() + map_range.size()).into(),
            file_offset: map_range.offset,
            name,
            is_readable: map_range.is_read(),
            is_writable: map_range.is_write(),
            is_executable: map_range.is_exec(),
            is_shared_memory: &map_range.flags[3..4] == "s",
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn short_name(&self) -> &str {
        self.name
            .as_ref()
            .map(|name: &String| {
                Path::new(name)
                    .file_name()
                    .expect("mmap region ends in ..")
                    .to_str()
                    .unwrap_or("Non-UTF8 string after splitting path")
            })
            .unwrap_or("[anon]")
    }

    pub fn size_bytes(&self) -> usize {
        self.end - self.start
    }

    /// Address the backing file was mapped at, accounting for the
    /// file offset of this particular region.  Symbol values from the
    /// ELF tables are relative to this address.
    pub fn mmap_start_address(&self) -> Pointer {
        self.start - self.file_offset
    }

    pub fn address_range(&self) -> Range<Pointer> {
        self.start..self.end
    }

    pub fn file_offset(&self) -> usize {
        self.file_offset
    }

    pub fn contains(&self, ptr: Pointer) -> bool {
        (self.start <= ptr) && (ptr < self.end)
    }

    pub fn matches_name(&self, search_name: &str) -> bool {
        self.name
            .as_ref()
            .map(|name| name == search_name)
            .unwrap_or(false)
    }

    pub fn is_file_backed(&self) -> bool {
        self.name
            .as_ref()
            .map(|name| name.starts_with('/'))
            .unwrap_or(false)
    }

    pub fn iter_symbols(&self) -> impl Iterator<Item = crate::Symbol> {
        crate::Symbol::iter_symbols(self)
    }

    pub fn flag_str(&self) -> String {
        format!(
            "{}{}{}{}",
            if self.is_readable { 'r' } else { '-' },
            if self.is_writable { 'w' } else { '-' },
            if self.is_executable { 'x' } else { '-' },
            if self.is_shared_memory { 's' } else { 'p' },
        )
    }
}

impl Display for MemoryMapRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.name.as_deref().unwrap_or("???");
        write!(
            f,
            "Region(PID {}, {} - {}, \"{}\")",
            self.pid, self.start, self.end, name
        )
    }
}
