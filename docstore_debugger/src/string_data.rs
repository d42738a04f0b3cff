use memory_probe::{ByteRange, UnpackedValue};

use crate::Error;

/// Read a null-terminated string starting at the beginning of the
/// given window.  The terminator search is bounded by the window, so
/// a missing NUL in corrupt memory surfaces as an error instead of a
/// runaway scan.  Consumes `len + 1` bytes.
pub fn unpack_cstring<'a>(
    view: ByteRange<'a>,
) -> Result<UnpackedValue<&'a str>, Error> {
    Ok(view.get_null_terminated(0usize)?)
}

/// Read a length-prefixed string starting at the beginning of the
/// given window.
///
/// Canonical convention: the 4-byte little-endian declared length
/// counts the string contents plus the trailing NUL, and the decoded
/// string excludes the NUL.  Total bytes consumed are `declared + 4`.
/// A declared length below 1, a length reaching past the window, or a
/// missing terminator byte all indicate corruption.
pub fn unpack_pascal_string(
    view: ByteRange,
) -> Result<(String, usize), Error> {
    let declared = view.get_i32(0usize)?;
    if declared < 1 {
        return Err(Error::InvalidStringLength(declared));
    }
    let declared = declared as usize;

    let contents = view.subrange(4..4 + declared)?;
    if contents.get_u8(declared - 1)? != 0 {
        return Err(Error::InvalidStringLength(declared as i32));
    }
    let text = std::str::from_utf8(&contents.bytes()[..declared - 1])
        .map_err(memory_probe::Error::from)?;

    Ok((text.to_string(), declared + 4))
}
