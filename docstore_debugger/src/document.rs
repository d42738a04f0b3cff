use std::cell::OnceCell;

use memory_probe::{
    ByteOrder, ByteRange, MemorySource, MemorySourceExt as _, OwnedBytes,
    Pointer,
};

use crate::element_value::{unpacker_for, ElementValue};
use crate::extensions::OrTryInit as _;
use crate::{DisplayHint, ElementType, Error};

/// Handle to an encoded document sitting in the inspected process.
///
/// The encoding is self-describing: a 4-byte little-endian declared
/// total length, a sequence of (type tag, null-terminated field name,
/// value) entries, and a trailing terminator byte.  The declared
/// length doubles as the corruption check; a length outside
/// `[EMPTY_SIZE, MAX_SIZE]` marks the whole document invalid and
/// field iteration yields nothing.
///
/// Construction reads only the length prefix.  The full window is
/// fetched on first field iteration and held for the lifetime of the
/// handle, so re-iterating is free.
#[derive(Clone)]
pub struct DocumentView {
    objdata: Pointer,
    objsize: i32,
    window: OnceCell<OwnedBytes>,
}

impl DocumentView {
    /// Size of a document with no fields: the length prefix and the
    /// terminator byte.
    pub const EMPTY_SIZE: i32 = 5;

    /// Upper sanity bound on the declared length.  Anything larger is
    /// assumed to be a misinterpreted buffer rather than a document.
    pub const MAX_SIZE: i32 = 64 * 1024 * 1024;

    /// Construct from a value resident in the inspected process,
    /// reading only the 4-byte length prefix.
    pub fn read(
        ptr: Pointer,
        source: &dyn MemorySource,
    ) -> Result<Self, Error> {
        let objsize = source.read_i32(ptr)?;
        Ok(Self {
            objdata: ptr,
            objsize,
            window: OnceCell::new(),
        })
    }

    /// Construct from an already-fetched byte window, as when
    /// recursing into a nested document.  Produces output
    /// indistinguishable from the [`DocumentView::read`] path.
    pub fn from_bytes(window: OwnedBytes) -> Self {
        let objdata = window.start();
        let objsize = window.as_range().get_i32(0usize).unwrap_or(0);
        let cell = OnceCell::new();
        let _ = cell.set(window);
        Self {
            objdata,
            objsize,
            window: cell,
        }
    }

    pub fn objdata(&self) -> Pointer {
        self.objdata
    }

    /// The declared total length, as read from the first 4 bytes.
    pub fn objsize(&self) -> i32 {
        self.objsize
    }

    pub fn is_valid(&self) -> bool {
        (Self::EMPTY_SIZE..=Self::MAX_SIZE).contains(&self.objsize)
    }

    pub fn is_empty(&self) -> bool {
        self.objsize == Self::EMPTY_SIZE
    }

    pub fn display_hint(&self) -> DisplayHint {
        DisplayHint::Mapping
    }

    pub fn summary(&self) -> String {
        self.summary_as("Document", "document")
    }

    pub(crate) fn summary_as(&self, kind: &str, lower_kind: &str) -> String {
        if !self.is_valid() {
            format!("Invalid {lower_kind} of size {}", self.objsize)
        } else if self.is_empty() {
            format!("Empty {lower_kind}")
        } else {
            format!("{kind} of size {}", self.objsize)
        }
    }

    fn fetch_window(
        &self,
        source: &dyn MemorySource,
    ) -> Result<&OwnedBytes, Error> {
        self.window.or_try_init(|| -> Result<_, Error> {
            let end = self.objdata.try_add(self.objsize as usize)?;
            Ok(source.read_memory(self.objdata..end)?)
        })
    }

    /// Iterate the document's fields in buffer order.  Duplicate
    /// field names are legal and surfaced as-is.  Invalid documents
    /// yield nothing, as do documents read from a big-endian target:
    /// the element decoders interpret bytes as little-endian, and
    /// suppressing output beats emitting byte-swapped garbage.
    pub fn fields<'a>(
        &'a self,
        source: &dyn MemorySource,
    ) -> Result<FieldIter<'a>, Error> {
        if !self.is_valid() {
            return Ok(FieldIter::empty());
        }
        if source.byte_order() != ByteOrder::Little {
            return Ok(FieldIter::empty());
        }
        let window = self.fetch_window(source)?;
        Ok(FieldIter::new(window.as_range(), self.objsize as usize))
    }
}

impl std::fmt::Debug for DocumentView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentView")
            .field("objdata", &self.objdata)
            .field("objsize", &self.objsize)
            .finish()
    }
}

/// One decoded field: the name half may be discarded by the array
/// projection, but the walk itself always recovers both.
#[derive(Clone, Debug)]
pub struct DocumentField {
    pub name: String,

    /// The raw tag byte that selected the decoder.  Kept raw so that
    /// unrecognized tags remain inspectable.
    pub tag: u8,

    pub value: ElementValue,
}

impl DocumentField {
    pub fn element_type(&self) -> Option<ElementType> {
        ElementType::from_byte(self.tag)
    }
}

/// Restartable, lazily-decoding iterator over a document's fields.
/// Bounded by the declared document length; callers may stop
/// consuming early without paying for the rest of the decode.
pub struct FieldIter<'a> {
    bytes: ByteRange<'a>,

    /// Declared total length of the document being walked.
    objsize: usize,

    /// Upper bound for reads: the declared length clamped to the
    /// bytes actually available, in case the window was truncated.
    limit: usize,

    offset: usize,
    halted: bool,
}

impl<'a> FieldIter<'a> {
    fn new(bytes: ByteRange<'a>, objsize: usize) -> Self {
        let limit = objsize.min(bytes.len());
        Self {
            bytes,
            objsize,
            limit,
            offset: 4,
            halted: false,
        }
    }

    fn empty() -> Self {
        Self {
            bytes: ByteRange::new(Pointer::null(), &[]),
            objsize: 0,
            limit: 0,
            offset: 4,
            halted: true,
        }
    }

    fn halt(&mut self) -> Option<DocumentField> {
        self.halted = true;
        None
    }
}

impl<'a> Iterator for FieldIter<'a> {
    type Item = DocumentField;

    fn next(&mut self) -> Option<Self::Item> {
        if self.halted || self.offset + 1 >= self.objsize {
            return None;
        }

        let Ok(tag) = self.bytes.get_u8(self.offset) else {
            return self.halt();
        };
        let mut offset = self.offset + 1;

        let name = match self
            .bytes
            .subrange(offset..self.limit)
            .and_then(|rest| rest.get_null_terminated(0usize))
        {
            Ok(name) => name,
            Err(_) => return self.halt(),
        };
        offset += name.size_bytes() + 1;
        let name = name.value().to_string();

        let Ok(value_view) = self.bytes.subrange(offset..self.limit) else {
            return self.halt();
        };

        let unpack = unpacker_for(tag);
        match unpack(self.bytes.start() + offset, value_view) {
            Ok((value, consumed)) => {
                self.offset = offset + consumed;
                Some(DocumentField { name, tag, value })
            }
            Err(_) => {
                // A decoder that cannot make sense of its bytes
                // claims nothing; advancing the cursor past an
                // unknown encoding would desynchronize every field
                // after it.
                self.halted = true;
                Some(DocumentField {
                    name,
                    tag,
                    value: ElementValue::Invalid,
                })
            }
        }
    }
}
