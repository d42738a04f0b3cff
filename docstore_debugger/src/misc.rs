use memory_probe::ByteRange;

use crate::string_data::{unpack_cstring, unpack_pascal_string};
use crate::{DocumentView, Error, ObjectId};

/// A length-prefixed blob of binary data with its subtype byte.
/// UUID payloads are recognized before construction and never reach
/// this type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryData {
    pub subtype: u8,
    pub bytes: Vec<u8>,
}

impl BinaryData {
    /// Reads the 4-byte length, 1-byte subtype, and payload.  Total
    /// bytes consumed are `length + 5`.
    pub fn unpack_from(view: ByteRange) -> Result<(Self, usize), Error> {
        let length = view.get_i32(0usize)?;
        if length < 0 {
            return Err(Error::NegativeBinaryLength(length));
        }
        let length = length as usize;
        let subtype = view.get_u8(4usize)?;
        let bytes = view.subrange(5..5 + length)?.bytes().to_vec();
        Ok((Self { subtype, bytes }, length + 5))
    }
}

impl std::fmt::Display for BinaryData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BinData({}, {} bytes)", self.subtype, self.bytes.len())
    }
}

/// A regular expression: two null-terminated strings, pattern then
/// flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegexValue {
    pub pattern: String,
    pub flags: String,
}

impl RegexValue {
    /// Consumes `len(pattern) + len(flags) + 2` bytes.
    pub fn unpack_from(view: ByteRange) -> Result<(Self, usize), Error> {
        let pattern = unpack_cstring(view)?;
        let offset = pattern.size_bytes() + 1;
        let flags = unpack_cstring(view.subrange(offset..)?)?;
        let consumed = offset + flags.size_bytes() + 1;
        Ok((
            Self {
                pattern: pattern.value().to_string(),
                flags: flags.value().to_string(),
            },
            consumed,
        ))
    }
}

impl std::fmt::Display for RegexValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}/{}", self.pattern, self.flags)
    }
}

/// A deprecated namespace reference: a length-prefixed namespace
/// string followed by a 12-byte object identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DbPointer {
    pub namespace: String,
    pub id: ObjectId,
}

impl DbPointer {
    pub fn unpack_from(view: ByteRange) -> Result<(Self, usize), Error> {
        let (namespace, consumed) = unpack_pascal_string(view)?;
        let id = ObjectId::unpack_from(view.subrange(consumed..)?)?;
        Ok((Self { namespace, id }, consumed + ObjectId::SIZE))
    }
}

impl std::fmt::Display for DbPointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DBPointer({:?}, {})", self.namespace, self.id)
    }
}

/// A length-prefixed blob holding a code string and the document it
/// closes over.
#[derive(Clone, Debug)]
pub struct CodeWithScope {
    pub code: String,
    pub scope: DocumentView,
}

impl std::fmt::Display for CodeWithScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CodeWScope({:?}, {})", self.code, self.scope.summary())
    }
}
