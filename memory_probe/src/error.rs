use thiserror::Error;

use crate::Pointer;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error)]
pub enum Error {
    #[error("/proc/{0}/maps not found")]
    MemoryMapNotFound(u32),

    #[error("Path not convertible to UTF-8")]
    InvalidUTF8InPath,

    #[error("InvalidUTF8")]
    InvalidUTF8(#[from] std::str::Utf8Error),

    #[error(
        "No permissions to read memory.  \
         Consider temporarily disabling ptrace_scope protections \
         with 'echo 0 | sudo tee /proc/sys/kernel/yama/ptrace_scope'"
    )]
    MemoryReadInsufficientPermission,

    #[error("Attempted memory read at nullptr of remote process")]
    MemoryReadNullPointer,

    #[error("Bad address {0} in remote process")]
    MemoryReadBadAddress(Pointer),

    #[error(
        "Read of {num_requested} bytes at {start} \
         returned only {num_received}"
    )]
    IncompleteMemoryRead {
        start: Pointer,
        num_requested: usize,
        num_received: usize,
    },

    #[error("Address range {start}..{end} not backed by any stored segment")]
    UnmappedSnapshotRead { start: Pointer, end: Pointer },

    #[error("Pointer arithmetic overflow: {0} + {1}")]
    PointerOverflow(Pointer, usize),

    #[error(
        "Expected {expected} bytes at offset {offset} of byte window, \
         but only {available} remain"
    )]
    UnexpectedEndOfBuffer {
        offset: usize,
        expected: usize,
        available: usize,
    },

    #[error("No null terminator found within {0} remaining bytes")]
    MissingNullTerminator(usize),

    #[error("Error {err} reading process memory")]
    ProcessVM {
        #[source]
        err: nix::Error,
    },

    #[error(transparent)]
    Io {
        #[from]
        err: std::io::Error,
    },

    #[error(transparent)]
    InvalidElfFormat {
        #[from]
        err: elf::ParseError,
    },
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}
