#![allow(dead_code)]

use std::cell::RefCell;
use std::ops::Range;

use memory_probe::{
    ByteOrder, MemorySource, OwnedBytes, Pointer, SnapshotReader, Symbol,
};

/// Assembles encoded document buffers byte-by-byte, independently of
/// the decoder under test.
pub struct DocBuilder {
    fields: Vec<u8>,
}

impl DocBuilder {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn raw_element(
        mut self,
        tag: u8,
        name: &str,
        value_bytes: &[u8],
    ) -> Self {
        self.fields.push(tag);
        self.fields.extend_from_slice(name.as_bytes());
        self.fields.push(0);
        self.fields.extend_from_slice(value_bytes);
        self
    }

    fn pascal_string(text: &str) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&((text.len() + 1) as i32).to_le_bytes());
        bytes.extend_from_slice(text.as_bytes());
        bytes.push(0);
        bytes
    }

    pub fn double(self, name: &str, value: f64) -> Self {
        self.raw_element(0x01, name, &value.to_le_bytes())
    }

    pub fn string(self, name: &str, value: &str) -> Self {
        self.raw_element(0x02, name, &Self::pascal_string(value))
    }

    pub fn document(self, name: &str, nested: DocBuilder) -> Self {
        let bytes = nested.build();
        self.raw_element(0x03, name, &bytes)
    }

    pub fn array(self, name: &str, nested: ArrayBuilder) -> Self {
        let bytes = nested.build();
        self.raw_element(0x04, name, &bytes)
    }

    pub fn binary(self, name: &str, subtype: u8, payload: &[u8]) -> Self {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(payload.len() as i32).to_le_bytes());
        bytes.push(subtype);
        bytes.extend_from_slice(payload);
        self.raw_element(0x05, name, &bytes)
    }

    pub fn uuid(self, name: &str, uuid: &[u8; 16]) -> Self {
        self.binary(name, 0x04, uuid)
    }

    pub fn undefined(self, name: &str) -> Self {
        self.raw_element(0x06, name, &[])
    }

    pub fn object_id(self, name: &str, id: &[u8; 12]) -> Self {
        self.raw_element(0x07, name, id)
    }

    pub fn boolean(self, name: &str, value: bool) -> Self {
        self.raw_element(0x08, name, &[value as u8])
    }

    pub fn date(self, name: &str, millis: i64) -> Self {
        self.raw_element(0x09, name, &millis.to_le_bytes())
    }

    pub fn null(self, name: &str) -> Self {
        self.raw_element(0x0A, name, &[])
    }

    pub fn regex(self, name: &str, pattern: &str, flags: &str) -> Self {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(pattern.as_bytes());
        bytes.push(0);
        bytes.extend_from_slice(flags.as_bytes());
        bytes.push(0);
        self.raw_element(0x0B, name, &bytes)
    }

    pub fn db_pointer(
        self,
        name: &str,
        namespace: &str,
        id: &[u8; 12],
    ) -> Self {
        let mut bytes = Self::pascal_string(namespace);
        bytes.extend_from_slice(id);
        self.raw_element(0x0C, name, &bytes)
    }

    pub fn javascript(self, name: &str, code: &str) -> Self {
        self.raw_element(0x0D, name, &Self::pascal_string(code))
    }

    pub fn symbol(self, name: &str, value: &str) -> Self {
        self.raw_element(0x0E, name, &Self::pascal_string(value))
    }

    pub fn code_with_scope(
        self,
        name: &str,
        code: &str,
        scope: DocBuilder,
    ) -> Self {
        let code_bytes = Self::pascal_string(code);
        let scope_bytes = scope.build();
        let total = 4 + code_bytes.len() + scope_bytes.len();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(total as i32).to_le_bytes());
        bytes.extend_from_slice(&code_bytes);
        bytes.extend_from_slice(&scope_bytes);
        self.raw_element(0x0F, name, &bytes)
    }

    pub fn int32(self, name: &str, value: i32) -> Self {
        self.raw_element(0x10, name, &value.to_le_bytes())
    }

    pub fn timestamp(self, name: &str, seconds: u32, ordinal: u32) -> Self {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&ordinal.to_le_bytes());
        bytes.extend_from_slice(&seconds.to_le_bytes());
        self.raw_element(0x11, name, &bytes)
    }

    pub fn int64(self, name: &str, value: i64) -> Self {
        self.raw_element(0x12, name, &value.to_le_bytes())
    }

    pub fn decimal128(self, name: &str, low64: u64, high64: u64) -> Self {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&low64.to_le_bytes());
        bytes.extend_from_slice(&high64.to_le_bytes());
        self.raw_element(0x13, name, &bytes)
    }

    pub fn min_key(self, name: &str) -> Self {
        self.raw_element(0xFF, name, &[])
    }

    pub fn max_key(self, name: &str) -> Self {
        self.raw_element(0x7F, name, &[])
    }

    pub fn build(self) -> Vec<u8> {
        let total = 4 + self.fields.len() + 1;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(total as i32).to_le_bytes());
        bytes.extend_from_slice(&self.fields);
        bytes.push(0);
        bytes
    }

    /// Build with a forged declared length, for boundary tests.
    pub fn build_with_declared_size(self, declared: i32) -> Vec<u8> {
        let mut bytes = self.build();
        bytes[0..4].copy_from_slice(&declared.to_le_bytes());
        bytes
    }
}

/// Array buffers are document buffers whose field names are the
/// decimal element indices.
pub struct ArrayBuilder {
    doc: DocBuilder,
    next_index: usize,
}

impl ArrayBuilder {
    pub fn new() -> Self {
        Self {
            doc: DocBuilder::new(),
            next_index: 0,
        }
    }

    pub fn push(mut self, append: impl FnOnce(DocBuilder, &str) -> DocBuilder) -> Self {
        let name = self.next_index.to_string();
        self.next_index += 1;
        self.doc = append(self.doc, &name);
        self
    }

    pub fn int32(self, value: i32) -> Self {
        self.push(|doc, name| doc.int32(name, value))
    }

    pub fn string(self, value: &str) -> Self {
        self.push(|doc, name| doc.string(name, value))
    }

    pub fn build(self) -> Vec<u8> {
        self.doc.build()
    }
}

pub const DOC_ADDR: usize = 0x7f00_0000_1000;

/// A snapshot holding one document buffer at [`DOC_ADDR`].
pub fn snapshot_with_doc(bytes: &[u8]) -> (SnapshotReader, Pointer) {
    let addr = Pointer::new(DOC_ADDR);
    let mut snapshot = SnapshotReader::new();
    snapshot.add_segment(addr, bytes.to_vec());
    (snapshot, addr)
}

/// A writable scratch image of one memory segment, for assembling
/// fake process structures (lock tables, registries) byte-by-byte.
pub struct Arena {
    base: usize,
    bytes: Vec<u8>,
    symbols: Vec<(String, Range<usize>)>,
}

impl Arena {
    pub fn new(base: usize, size: usize) -> Self {
        Self {
            base,
            bytes: vec![0u8; size],
            symbols: Vec::new(),
        }
    }

    pub fn addr(&self, offset: usize) -> Pointer {
        Pointer::new(self.base + offset)
    }

    pub fn put_bytes(&mut self, offset: usize, bytes: &[u8]) {
        self.bytes[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn put_u32(&mut self, offset: usize, value: u32) {
        self.put_bytes(offset, &value.to_le_bytes());
    }

    pub fn put_u64(&mut self, offset: usize, value: u64) {
        self.put_bytes(offset, &value.to_le_bytes());
    }

    pub fn put_ptr(&mut self, offset: usize, target: Pointer) {
        self.put_u64(offset, target.as_usize() as u64);
    }

    pub fn put_ptr_to(&mut self, offset: usize, target_offset: usize) {
        let target = self.addr(target_offset);
        self.put_ptr(offset, target);
    }

    /// Lay down a libstdc++ `std::string` object at `offset` whose
    /// character data lives at `data_offset`.
    pub fn put_cxx_string(
        &mut self,
        offset: usize,
        data_offset: usize,
        text: &str,
    ) {
        self.put_ptr_to(offset, data_offset);
        self.put_u64(offset + 8, text.len() as u64);
        self.put_u64(offset + 16, text.len() as u64);
        self.put_bytes(data_offset, text.as_bytes());
    }

    /// Lay down a libstdc++ `std::vector` header at `offset` covering
    /// `num_bytes` of element storage at `elements_offset`.
    pub fn put_cxx_vector(
        &mut self,
        offset: usize,
        elements_offset: usize,
        num_bytes: usize,
    ) {
        self.put_ptr_to(offset, elements_offset);
        self.put_ptr_to(offset + 8, elements_offset + num_bytes);
        self.put_ptr_to(offset + 16, elements_offset + num_bytes);
    }

    pub fn add_symbol(&mut self, name: &str, location: Range<usize>) {
        self.symbols.push((name.to_string(), location));
    }

    pub fn into_snapshot(self) -> SnapshotReader {
        let mut snapshot = SnapshotReader::new();
        let base = self.base;
        snapshot.add_segment(Pointer::new(base), self.bytes);
        for (name, location) in self.symbols {
            snapshot.add_symbol(
                name,
                Pointer::new(base + location.start)
                    ..Pointer::new(base + location.end),
            );
        }
        snapshot
    }
}

/// Wraps a `MemorySource` and counts calls, for asserting how much
/// I/O a decode actually issued.
pub struct CountingSource<S> {
    inner: S,
    pub reads: RefCell<usize>,
    pub symbol_lookups: RefCell<usize>,
}

impl<S> CountingSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            reads: RefCell::new(0),
            symbol_lookups: RefCell::new(0),
        }
    }

    pub fn read_count(&self) -> usize {
        *self.reads.borrow()
    }

    pub fn symbol_lookup_count(&self) -> usize {
        *self.symbol_lookups.borrow()
    }
}

impl<S: MemorySource> MemorySource for CountingSource<S> {
    fn read_memory(
        &self,
        range: Range<Pointer>,
    ) -> Result<OwnedBytes, memory_probe::Error> {
        *self.reads.borrow_mut() += 1;
        self.inner.read_memory(range)
    }

    fn lookup_symbol(&self, name: &str) -> Option<Symbol> {
        self.inner.lookup_symbol(name)
    }

    fn symbol_at(&self, location: Pointer) -> Option<String> {
        *self.symbol_lookups.borrow_mut() += 1;
        self.inner.symbol_at(location)
    }

    fn byte_order(&self) -> ByteOrder {
        self.inner.byte_order()
    }
}
