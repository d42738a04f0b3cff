use std::cell::OnceCell;

use memory_probe::{MemorySource, MemorySourceExt as _, Pointer};

use crate::extensions::TryInsert as _;
use crate::stdlib_layout::CxxVector;
use crate::{ContextReader, Error};

/// Decorations are dynamically-registered storage slots carved out of
/// an opaque per-object buffer.  The slot's compile-time type is not
/// recorded in the object; it has to be recovered from the
/// constructor and typeinfo metadata the compiler emitted for the
/// registration site.

/// The resolved types of every decoration slot of one decorated
/// owner type.  The slot count for a given owner is fixed in the
/// inspected program, so indices are stable identifiers and the
/// resolution result can be cached for the lifetime of the process.
pub struct DecorationSlotTypes {
    slots: Vec<OnceCell<Option<String>>>,
}

impl DecorationSlotTypes {
    fn new(num_slots: usize) -> Self {
        Self {
            slots: (0..num_slots).map(|_| OnceCell::new()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn get_or_resolve(
        &self,
        index: usize,
        resolve: impl FnOnce() -> Option<String>,
    ) -> Option<String> {
        self.slots[index].get_or_init(resolve).clone()
    }
}

/// One decoration slot of a decorated object: where its storage
/// lives, and the recovered type when the metadata allowed recovery.
#[derive(Clone, Debug)]
pub struct Decoration {
    pub type_name: Option<String>,
    pub location: Pointer,
}

/// A registry entry before type resolution.  Null pointers mean the
/// layout in question does not record that piece of metadata.
struct RawSlot {
    offset: usize,
    type_info: Pointer,
    constructor: Pointer,
}

struct ResolvedLayout {
    storage: Pointer,
    slots: Vec<RawSlot>,
}

type LayoutProbe =
    fn(&ContextReader, &str, Pointer) -> Result<Option<ResolvedLayout>, Error>;

/// The historical decoration layouts, probed newest-first.  Each
/// probe either recognizes the layout and decodes it fully, or
/// reports a definite miss so the next one can try.
const LAYOUT_PROBES: &[LayoutProbe] =
    &[probe_registry_global, probe_embedded_container];

/// Current layout: the owner embeds only the storage buffer pointer,
/// and the registry lives in a per-owner-type global.  Registry
/// entries carry the slot's typeinfo pointer, its constructor, and
/// its byte offset into the storage buffer.
fn probe_registry_global(
    reader: &ContextReader,
    owner_type: &str,
    block: Pointer,
) -> Result<Option<ResolvedLayout>, Error> {
    const ENTRY_STRIDE: usize = 24;

    let symbol_name = format!(
        "docstore::decoration_detail::registry<{owner_type}>::instance"
    );
    let Some(symbol) = reader.lookup_symbol(&symbol_name) else {
        return Ok(None);
    };

    let registry = reader.read_pointer(symbol.location.start)?;
    let Some(registry) = registry.as_non_null() else {
        return Ok(None);
    };

    let entries = CxxVector::read(registry, reader)?;
    let slots = entries
        .iter_element_ptrs(ENTRY_STRIDE)
        .map(|entry| -> Result<RawSlot, Error> {
            let bytes =
                reader.read_memory(entry..entry.try_add(ENTRY_STRIDE)?)?;
            Ok(RawSlot {
                type_info: bytes.subrange(0..8)?.unpack()?,
                constructor: bytes.subrange(8..16)?.unpack()?,
                offset: bytes.subrange(16..24)?.unpack::<u64>()? as usize,
            })
        })
        .collect::<Result<_, _>>()?;

    let storage = reader.read_pointer(block)?;
    Ok(Some(ResolvedLayout { storage, slots }))
}

/// Legacy layout: the owner embeds a pointer to its registry followed
/// by the storage buffer pointer.  Entries carry only the constructor
/// and the slot's index into the buffer; no typeinfo was recorded.
fn probe_embedded_container(
    reader: &ContextReader,
    _owner_type: &str,
    block: Pointer,
) -> Result<Option<ResolvedLayout>, Error> {
    const ENTRY_STRIDE: usize = 16;

    let registry = reader.read_pointer(block)?;
    let Some(registry) = registry.as_non_null() else {
        return Ok(None);
    };
    let storage = reader.read_pointer(block + 8)?;

    let entries = CxxVector::read(registry, reader)?;
    let slots = entries
        .iter_element_ptrs(ENTRY_STRIDE)
        .map(|entry| -> Result<RawSlot, Error> {
            let bytes =
                reader.read_memory(entry..entry.try_add(ENTRY_STRIDE)?)?;
            Ok(RawSlot {
                type_info: Pointer::null(),
                constructor: bytes.subrange(0..8)?.unpack()?,
                offset: bytes.subrange(8..16)?.unpack::<u64>()? as usize,
            })
        })
        .collect::<Result<_, _>>()?;

    Ok(Some(ResolvedLayout { storage, slots }))
}

/// Walks the decoration slots of one decorated object.
pub struct DecorationWalker<'a> {
    reader: &'a ContextReader<'a>,
    owner_type: String,
    block: Pointer,
}

impl<'a> DecorationWalker<'a> {
    /// `block` is the address of the owner's embedded decoration
    /// block, and `owner_type` its declared type name, which keys the
    /// process-wide slot-type cache.
    pub fn new(
        reader: &'a ContextReader<'a>,
        owner_type: impl Into<String>,
        block: Pointer,
    ) -> Self {
        Self {
            reader,
            owner_type: owner_type.into(),
            block,
        }
    }

    /// Produce each decoration slot in registration order.  Slot
    /// types are resolved at most once per (owner type, slot index)
    /// for the lifetime of the inspection context; resolution
    /// failures are recorded and surfaced as unresolved slots rather
    /// than errors.
    pub fn decorations(
        &self,
    ) -> Result<impl Iterator<Item = Decoration> + '_, Error> {
        let layout = LAYOUT_PROBES
            .iter()
            .find_map(|probe| {
                probe(self.reader, &self.owner_type, self.block).transpose()
            })
            .transpose()?
            .ok_or_else(|| {
                Error::DecorationRegistryNotFound(self.owner_type.clone())
            })?;

        let slot_types = self.reader.context().decoration_slot_types.try_insert(
            self.owner_type.clone(),
            || -> Result<_, Error> {
                Ok(DecorationSlotTypes::new(layout.slots.len()))
            },
        )?;
        if slot_types.len() != layout.slots.len() {
            return Err(Error::DecorationSlotCountChanged {
                type_name: self.owner_type.clone(),
                expected: slot_types.len(),
                actual: layout.slots.len(),
            });
        }

        let reader = self.reader;
        let storage = layout.storage;
        Ok(layout.slots.into_iter().enumerate().map(
            move |(index, raw)| {
                let type_name = slot_types.get_or_resolve(index, || {
                    resolve_slot_type(reader, &raw)
                });
                Decoration {
                    type_name,
                    location: storage + raw.offset,
                }
            },
        ))
    }
}

/// Recover the compile-time type of a slot from whichever metadata
/// its layout recorded: the typeinfo symbol when present, otherwise
/// the template argument of the registered constructor.
fn resolve_slot_type(
    reader: &ContextReader,
    raw: &RawSlot,
) -> Option<String> {
    if let Some(type_info) = raw.type_info.as_non_null() {
        if let Some(name) = reader.symbol_at(type_info) {
            if let Some(type_name) = name.strip_prefix("typeinfo for ") {
                return Some(type_name.to_string());
            }
        }
    }

    let constructor = raw.constructor.as_non_null()?;
    let name = reader.symbol_at(constructor)?;
    extract_template_argument(&name, "construct_at")
}

/// Pull `T` out of a demangled name like
/// `void docstore::decoration_detail::Registry::construct_at<T>(void*)`.
/// `T` may itself contain template arguments, so the scan balances
/// angle brackets instead of taking the next `>`.
fn extract_template_argument(
    demangled: &str,
    method: &str,
) -> Option<String> {
    let marker = format!("{method}<");
    let start = demangled.find(&marker)? + marker.len();

    let mut depth = 1usize;
    for (index, ch) in demangled[start..].char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth == 0 {
                    return Some(
                        demangled[start..start + index].trim().to_string(),
                    );
                }
            }
            _ => {}
        }
    }
    None
}
