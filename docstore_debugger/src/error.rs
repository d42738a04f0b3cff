use memory_probe::Pointer;
use thiserror::Error;

#[derive(Error)]
pub enum Error {
    #[error("memory_probe::Error{{ {err} }}")]
    MemoryProbe {
        #[from]
        err: memory_probe::Error,
    },

    #[error("std::fmt::Error{{ {err} }}")]
    FmtError {
        #[from]
        err: std::fmt::Error,
    },

    #[error("Could not find symbol '{0}' in the inspected process")]
    SymbolNotFound(String),

    #[error(
        "Declared length of string should be at least 1 \
         to hold its null terminator, but found length of {0}"
    )]
    InvalidStringLength(i32),

    #[error("Declared length {0} of nested document lies outside sane bounds")]
    InvalidDocumentLength(i32),

    #[error("Declared length of binary data should be non-negative, but found {0}")]
    NegativeBinaryLength(i32),

    #[error(
        "std::string at {ptr} claims {size} bytes, \
         beyond any plausible string in the inspected server"
    )]
    CorruptStdString { ptr: Pointer, size: usize },

    #[error(
        "std::vector at {ptr} claims {count} elements, \
         beyond any plausible registry in the inspected server"
    )]
    CorruptStdVector { ptr: Pointer, count: usize },

    #[error(
        "Could not locate the lock manager, either as a global \
         or as a decoration on the global service context"
    )]
    LockManagerNotFound,

    #[error("Lock request chain exceeded {0} entries, assuming a corrupt list")]
    LockChainTooLong(usize),

    #[error("Could not locate the decoration registry for type {0}")]
    DecorationRegistryNotFound(String),

    #[error(
        "Decoration registry for {type_name} changed \
         from {expected} to {actual} slots"
    )]
    DecorationSlotCountChanged {
        type_name: String,
        expected: usize,
        actual: usize,
    },
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}
