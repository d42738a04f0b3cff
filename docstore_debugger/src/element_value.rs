use derive_more::derive::From;
use memory_probe::{ByteRange, OwnedBytes, Pointer};

use crate::string_data::unpack_pascal_string;
use crate::{
    ArrayView, BinaryData, CodeWithScope, DateTime, DbPointer, Decimal128,
    DocumentView, Error, ObjectId, RegexValue, Timestamp, Uuid,
};

/// How the host debugger should indent a value's children.  A
/// presentation hint only; it carries no structural information.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayHint {
    Mapping,
    Sequence,
    Str,
}

/// A single decoded field value.
///
/// `Invalid` is the sentinel produced for unrecognized type tags and
/// for value bytes that contradict their own length fields.  It
/// always claims the remainder of the enclosing buffer, halting the
/// field walk rather than risking a desynchronized cursor.
#[derive(Clone, Debug, From)]
pub enum ElementValue {
    #[from]
    Double(f64),
    String(String),
    #[from]
    Document(DocumentView),
    #[from]
    Array(ArrayView),
    #[from]
    Binary(BinaryData),
    #[from]
    Uuid(Uuid),
    Undefined,
    #[from]
    ObjectId(ObjectId),
    #[from]
    Boolean(bool),
    #[from]
    DateTime(DateTime),
    Null,
    #[from]
    Regex(RegexValue),
    #[from]
    DbPointer(DbPointer),
    JavaScript(String),
    Symbol(String),
    #[from]
    CodeWithScope(CodeWithScope),
    #[from]
    Int32(i32),
    #[from]
    Timestamp(Timestamp),
    #[from]
    Int64(i64),
    #[from]
    Decimal128(Decimal128),
    MinKey,
    MaxKey,
    Invalid,
}

impl ElementValue {
    pub fn display_hint(&self) -> Option<DisplayHint> {
        match self {
            Self::Document(_) => Some(DisplayHint::Mapping),
            Self::Array(_) => Some(DisplayHint::Sequence),
            Self::String(_) | Self::JavaScript(_) | Self::Symbol(_) => {
                Some(DisplayHint::Str)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for ElementValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Double(val) => write!(f, "{val}"),
            Self::String(val) => write!(f, "{val:?}"),
            Self::Document(val) => write!(f, "{}", val.summary()),
            Self::Array(val) => write!(f, "{}", val.summary()),
            Self::Binary(val) => write!(f, "{val}"),
            Self::Uuid(val) => write!(f, "{val}"),
            Self::Undefined => write!(f, "undefined"),
            Self::ObjectId(val) => write!(f, "{val}"),
            Self::Boolean(val) => write!(f, "{val}"),
            Self::DateTime(val) => write!(f, "{val}"),
            Self::Null => write!(f, "null"),
            Self::Regex(val) => write!(f, "{val}"),
            Self::DbPointer(val) => write!(f, "{val}"),
            Self::JavaScript(val) => write!(f, "Code({val:?})"),
            Self::Symbol(val) => write!(f, "Symbol({val:?})"),
            Self::CodeWithScope(val) => write!(f, "{val}"),
            Self::Int32(val) => write!(f, "{val}"),
            Self::Timestamp(val) => write!(f, "{val}"),
            Self::Int64(val) => write!(f, "{val}"),
            Self::Decimal128(val) => write!(f, "{val}"),
            Self::MinKey => write!(f, "MinKey()"),
            Self::MaxKey => write!(f, "MaxKey()"),
            Self::Invalid => write!(f, "Invalid data"),
        }
    }
}

/// An element decoder: given the absolute address of the value's
/// first byte and a window starting at that byte, return the decoded
/// value and the number of bytes it occupied.  Decoders never read
/// past the supplied window.
pub(crate) type Unpacker =
    fn(Pointer, ByteRange) -> Result<(ElementValue, usize), Error>;

fn unpack_invalid(
    _ptr: Pointer,
    view: ByteRange,
) -> Result<(ElementValue, usize), Error> {
    Ok((ElementValue::Invalid, view.len()))
}

fn unpack_double(
    _ptr: Pointer,
    view: ByteRange,
) -> Result<(ElementValue, usize), Error> {
    Ok((ElementValue::Double(view.get_f64(0usize)?), 8))
}

fn unpack_string(
    _ptr: Pointer,
    view: ByteRange,
) -> Result<(ElementValue, usize), Error> {
    let (text, consumed) = unpack_pascal_string(view)?;
    Ok((ElementValue::String(text), consumed))
}

/// Slice the declared extent of a nested document or array out of the
/// parent's already-fetched window.  No further memory reads are
/// issued for the nested decode; this must be observably equivalent
/// to re-fetching the same range.
fn nested_window(view: ByteRange) -> Result<(OwnedBytes, usize), Error> {
    let objsize = view.get_i32(0usize)?;
    if objsize < DocumentView::EMPTY_SIZE {
        return Err(Error::InvalidDocumentLength(objsize));
    }
    let size = objsize as usize;
    let nested = view.subrange(0..size)?;
    Ok((OwnedBytes::new(nested.start(), nested.bytes().to_vec()), size))
}

fn unpack_document(
    _ptr: Pointer,
    view: ByteRange,
) -> Result<(ElementValue, usize), Error> {
    let (window, consumed) = nested_window(view)?;
    Ok((ElementValue::Document(DocumentView::from_bytes(window)), consumed))
}

fn unpack_array(
    _ptr: Pointer,
    view: ByteRange,
) -> Result<(ElementValue, usize), Error> {
    let (window, consumed) = nested_window(view)?;
    Ok((ElementValue::Array(ArrayView::from_bytes(window)), consumed))
}

fn unpack_binary(
    _ptr: Pointer,
    view: ByteRange,
) -> Result<(ElementValue, usize), Error> {
    let (binary, consumed) = BinaryData::unpack_from(view)?;
    if binary.subtype == Uuid::BINARY_SUBTYPE
        && binary.bytes.len() == Uuid::SIZE
    {
        let uuid = Uuid::unpack_from(view.subrange(5..5 + Uuid::SIZE)?)?;
        return Ok((ElementValue::Uuid(uuid), consumed));
    }
    Ok((ElementValue::Binary(binary), consumed))
}

fn unpack_undefined(
    _ptr: Pointer,
    _view: ByteRange,
) -> Result<(ElementValue, usize), Error> {
    Ok((ElementValue::Undefined, 0))
}

fn unpack_object_id(
    _ptr: Pointer,
    view: ByteRange,
) -> Result<(ElementValue, usize), Error> {
    Ok((
        ElementValue::ObjectId(ObjectId::unpack_from(view)?),
        ObjectId::SIZE,
    ))
}

fn unpack_bool(
    _ptr: Pointer,
    view: ByteRange,
) -> Result<(ElementValue, usize), Error> {
    Ok((ElementValue::Boolean(view.get_u8(0usize)? > 0), 1))
}

fn unpack_date(
    _ptr: Pointer,
    view: ByteRange,
) -> Result<(ElementValue, usize), Error> {
    Ok((
        ElementValue::DateTime(DateTime::unpack_from(view)?),
        DateTime::SIZE,
    ))
}

fn unpack_null(
    _ptr: Pointer,
    _view: ByteRange,
) -> Result<(ElementValue, usize), Error> {
    Ok((ElementValue::Null, 0))
}

fn unpack_regexp(
    _ptr: Pointer,
    view: ByteRange,
) -> Result<(ElementValue, usize), Error> {
    let (regex, consumed) = RegexValue::unpack_from(view)?;
    Ok((ElementValue::Regex(regex), consumed))
}

fn unpack_db_pointer(
    _ptr: Pointer,
    view: ByteRange,
) -> Result<(ElementValue, usize), Error> {
    let (db_pointer, consumed) = DbPointer::unpack_from(view)?;
    Ok((ElementValue::DbPointer(db_pointer), consumed))
}

fn unpack_javascript(
    _ptr: Pointer,
    view: ByteRange,
) -> Result<(ElementValue, usize), Error> {
    let (text, consumed) = unpack_pascal_string(view)?;
    Ok((ElementValue::JavaScript(text), consumed))
}

fn unpack_symbol(
    _ptr: Pointer,
    view: ByteRange,
) -> Result<(ElementValue, usize), Error> {
    let (text, consumed) = unpack_pascal_string(view)?;
    Ok((ElementValue::Symbol(text), consumed))
}

fn unpack_code_with_scope(
    _ptr: Pointer,
    view: ByteRange,
) -> Result<(ElementValue, usize), Error> {
    let total = view.get_i32(0usize)?;
    if total < 4 {
        return Err(Error::InvalidDocumentLength(total));
    }
    let total = total as usize;
    let blob = view.subrange(0..total)?;

    let (code, code_consumed) = unpack_pascal_string(blob.subrange(4..)?)?;
    let (scope_window, _) = nested_window(blob.subrange(4 + code_consumed..)?)?;

    Ok((
        ElementValue::CodeWithScope(CodeWithScope {
            code,
            scope: DocumentView::from_bytes(scope_window),
        }),
        total,
    ))
}

fn unpack_int32(
    _ptr: Pointer,
    view: ByteRange,
) -> Result<(ElementValue, usize), Error> {
    Ok((ElementValue::Int32(view.get_i32(0usize)?), 4))
}

fn unpack_timestamp(
    _ptr: Pointer,
    view: ByteRange,
) -> Result<(ElementValue, usize), Error> {
    Ok((
        ElementValue::Timestamp(Timestamp::unpack_from(view)?),
        Timestamp::SIZE,
    ))
}

fn unpack_int64(
    _ptr: Pointer,
    view: ByteRange,
) -> Result<(ElementValue, usize), Error> {
    Ok((ElementValue::Int64(view.get_i64(0usize)?), 8))
}

fn unpack_decimal128(
    _ptr: Pointer,
    view: ByteRange,
) -> Result<(ElementValue, usize), Error> {
    Ok((
        ElementValue::Decimal128(Decimal128::unpack_from(view)?),
        Decimal128::SIZE,
    ))
}

fn unpack_minkey(
    _ptr: Pointer,
    _view: ByteRange,
) -> Result<(ElementValue, usize), Error> {
    Ok((ElementValue::MinKey, 0))
}

fn unpack_maxkey(
    _ptr: Pointer,
    _view: ByteRange,
) -> Result<(ElementValue, usize), Error> {
    Ok((ElementValue::MaxKey, 0))
}

/// Total mapping from all 256 possible tag bytes to a decoder.  Every
/// slot not claimed by a known element type holds the invalid-data
/// handler.
const UNPACKERS: [Unpacker; 256] = {
    let mut table = [unpack_invalid as Unpacker; 256];
    table[0x01] = unpack_double;
    table[0x02] = unpack_string;
    table[0x03] = unpack_document;
    table[0x04] = unpack_array;
    table[0x05] = unpack_binary;
    table[0x06] = unpack_undefined;
    table[0x07] = unpack_object_id;
    table[0x08] = unpack_bool;
    table[0x09] = unpack_date;
    table[0x0A] = unpack_null;
    table[0x0B] = unpack_regexp;
    table[0x0C] = unpack_db_pointer;
    table[0x0D] = unpack_javascript;
    table[0x0E] = unpack_symbol;
    table[0x0F] = unpack_code_with_scope;
    table[0x10] = unpack_int32;
    table[0x11] = unpack_timestamp;
    table[0x12] = unpack_int64;
    table[0x13] = unpack_decimal128;
    table[0x7F] = unpack_maxkey;
    table[0xFF] = unpack_minkey;
    table
};

pub(crate) fn unpacker_for(tag: u8) -> Unpacker {
    UNPACKERS[tag as usize]
}
