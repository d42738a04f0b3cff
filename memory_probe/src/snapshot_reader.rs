use std::ops::Range;

use crate::{
    ByteOrder, Error, MemorySource, OwnedBytes, Pointer, Result, Symbol,
};

/// A `MemorySource` over captured memory segments instead of a live
/// process.  Used when decoding a region that was already fetched
/// elsewhere, or a hand-assembled image of one; decoding through a
/// snapshot must be indistinguishable from decoding the same bytes
/// through a `ProcessReader`.
pub struct SnapshotReader {
    segments: Vec<OwnedBytes>,
    symbols: Vec<Symbol>,
    byte_order: ByteOrder,
}

impl SnapshotReader {
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
            symbols: Vec::new(),
            byte_order: ByteOrder::Little,
        }
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn add_segment(&mut self, start: Pointer, bytes: Vec<u8>) {
        self.segments.push(OwnedBytes::new(start, bytes));
    }

    pub fn add_symbol(
        &mut self,
        name: impl Into<String>,
        location: Range<Pointer>,
    ) {
        self.symbols.push(Symbol::new(name, location));
    }

    fn find_segment(&self, range: &Range<Pointer>) -> Option<&OwnedBytes> {
        self.segments.iter().find(|segment| {
            segment.start() <= range.start && range.end <= segment.end()
        })
    }
}

impl Default for SnapshotReader {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource for SnapshotReader {
    fn read_memory(&self, range: Range<Pointer>) -> Result<OwnedBytes> {
        if range.start.is_null() {
            return Err(Error::MemoryReadNullPointer);
        }
        let segment = self.find_segment(&range).ok_or(
            Error::UnmappedSnapshotRead {
                start: range.start,
                end: range.end,
            },
        )?;
        let bytes = segment.subrange(range.clone())?;
        Ok(OwnedBytes::new(range.start, bytes.bytes().to_vec()))
    }

    fn lookup_symbol(&self, name: &str) -> Option<Symbol> {
        self.symbols
            .iter()
            .find(|symbol| symbol.matches(name))
            .cloned()
    }

    fn symbol_at(&self, location: Pointer) -> Option<String> {
        self.symbols
            .iter()
            .find(|symbol| symbol.contains(location))
            .map(|symbol| symbol.demangled())
    }

    fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }
}
