use memory_probe::{
    MemorySource, MemorySourceExt as _, OwnedBytes, Pointer,
};

use crate::extensions::TryInsert as _;
use crate::stdlib_layout::{CxxString, CxxVector};
use crate::{unpack_fields, ContextReader, DecorationWalker, Error};

/// Reconstruction of the server's lock manager: a hash-bucketed table
/// of per-resource lock queues.  Mirrors the server's own diagnostic
/// dump, which only reports resources that currently have at least
/// one granted request; a resource nobody holds cannot participate in
/// a deadlock.

/// View over a `docstore::LockManager` residing in the inspected
/// process.
pub struct LockManagerView {
    location: Pointer,
    num_buckets: u32,
}

impl LockManagerView {
    const GLOBAL_SYMBOL: &'static str = "docstore::global_lock_manager";
    const SERVICE_CONTEXT_SYMBOL: &'static str =
        "docstore::global_service_context";
    const NUM_BUCKETS_SYMBOL: &'static str =
        "docstore::LockManager::kNumBuckets";
    const LOCK_MANAGER_TYPE: &'static str = "docstore::LockManager";
    const SERVICE_CONTEXT_TYPE: &'static str = "docstore::ServiceContext";

    /// Offset of the decoration block within a service context
    /// object, past its vtable pointer.
    const SERVICE_CONTEXT_DECORATIONS_OFFSET: usize = 8;

    pub fn new(
        location: Pointer,
        reader: &ContextReader,
    ) -> Result<Self, Error> {
        let symbol = reader
            .lookup_symbol(Self::NUM_BUCKETS_SYMBOL)
            .ok_or_else(|| {
                Error::SymbolNotFound(Self::NUM_BUCKETS_SYMBOL.to_string())
            })?;
        let num_buckets = reader.read_u32(symbol.location.start)?;
        Ok(Self {
            location,
            num_buckets,
        })
    }

    /// Find the process's lock manager.  Probed in order: the
    /// standalone global it used to be, then its newer home as a
    /// decoration on the global service context.
    pub fn locate(reader: &ContextReader) -> Result<Self, Error> {
        if let Some(symbol) = reader.lookup_symbol(Self::GLOBAL_SYMBOL) {
            return Self::new(symbol.location.start, reader);
        }

        let symbol = reader
            .lookup_symbol(Self::SERVICE_CONTEXT_SYMBOL)
            .ok_or(Error::LockManagerNotFound)?;
        let service_context = reader.read_pointer(symbol.location.start)?;
        let service_context = service_context
            .as_non_null()
            .ok_or(Error::LockManagerNotFound)?;

        let walker = DecorationWalker::new(
            reader,
            Self::SERVICE_CONTEXT_TYPE,
            service_context + Self::SERVICE_CONTEXT_DECORATIONS_OFFSET,
        );
        let location = walker
            .decorations()?
            .find(|decoration| {
                decoration.type_name.as_deref()
                    == Some(Self::LOCK_MANAGER_TYPE)
            })
            .map(|decoration| decoration.location)
            .ok_or(Error::LockManagerNotFound)?;

        Self::new(location, reader)
    }

    pub fn location(&self) -> Pointer {
        self.location
    }

    pub fn num_buckets(&self) -> u32 {
        self.num_buckets
    }

    /// Lazily walk every bucket chain, yielding each resource that
    /// currently has at least one granted request.
    pub fn resources<'a>(
        &self,
        reader: &'a ContextReader<'a>,
    ) -> Result<ResourceIter<'a>, Error> {
        let buckets_base = reader.read_pointer(self.location)?;
        Ok(ResourceIter {
            reader,
            buckets_base,
            num_buckets: self.num_buckets as usize,
            next_bucket: 0,
            next_entry: Pointer::null(),
            steps: 0,
            done: false,
        })
    }

    pub fn summary(&self, reader: &ContextReader) -> String {
        let any = self
            .resources(reader)
            .map(|mut iter| iter.next().is_some())
            .unwrap_or(false);
        if any {
            "Lock manager dump".to_string()
        } else {
            "Lock manager dump (no strong locks held or pending)".to_string()
        }
    }
}

/// One resource surfaced by the bucket walk.
pub struct LockedResource {
    pub res_id: ResourceId,
    pub lock_head: LockHead,
}

pub struct ResourceIter<'a> {
    reader: &'a ContextReader<'a>,
    buckets_base: Pointer,
    num_buckets: usize,
    next_bucket: usize,
    next_entry: Pointer,
    steps: usize,
    done: bool,
}

impl<'a> ResourceIter<'a> {
    /// Cap on chain traversal, in case a corrupted next pointer loops
    /// the chain back on itself.
    const MAX_STEPS: usize = 100_000;

    fn step(&mut self) -> Result<Option<LockedResource>, Error> {
        loop {
            self.steps += 1;
            if self.steps > Self::MAX_STEPS {
                return Err(Error::LockChainTooLong(Self::MAX_STEPS));
            }

            if self.next_entry.is_null() {
                if self.next_bucket >= self.num_buckets {
                    return Ok(None);
                }
                let bucket_ptr =
                    self.buckets_base + self.next_bucket * BucketEntry::PTR_SIZE;
                self.next_entry = self.reader.read_pointer(bucket_ptr)?;
                self.next_bucket += 1;
                continue;
            }

            let entry = BucketEntry::read(self.next_entry, self.reader)?;
            self.next_entry = entry.next();

            let lock_head = LockHead::read(entry.lock_head(), self.reader)?;
            if !lock_head.has_granted() {
                continue;
            }

            return Ok(Some(LockedResource {
                res_id: ResourceId::new(entry.res_id()),
                lock_head,
            }));
        }
    }
}

impl<'a> Iterator for ResourceIter<'a> {
    type Item = Result<LockedResource, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(resource)) => Some(Ok(resource)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// One link of a bucket's chain: the resource id it indexes and the
/// lock queue for that resource.
pub struct BucketEntry {
    bytes: OwnedBytes,
}

impl BucketEntry {
    pub const SIZE: usize = 24;
    const PTR_SIZE: usize = 8;

    unpack_fields! {
        res_id: {u64, 0..8},
        lock_head: {Pointer, 8..16},
        next: {Pointer, 16..24},
    }

    pub fn read(
        ptr: Pointer,
        source: &dyn MemorySource,
    ) -> Result<Self, Error> {
        let bytes = source.read_memory(ptr..ptr.try_add(Self::SIZE)?)?;
        Ok(Self { bytes })
    }
}

/// Per-resource lock queue state: the granted and pending request
/// lists, plus the mode masks the server maintains alongside them.
pub struct LockHead {
    bytes: OwnedBytes,
}

impl LockHead {
    pub const SIZE: usize = 40;

    unpack_fields! {
        granted_front: {Pointer, 0..8},
        granted_back: {Pointer, 8..16},
        pending_front: {Pointer, 16..24},
        pending_back: {Pointer, 24..32},
        granted_modes: {u32, 32..36},
        pending_modes: {u32, 36..40},
    }

    pub fn read(
        ptr: Pointer,
        source: &dyn MemorySource,
    ) -> Result<Self, Error> {
        let bytes = source.read_memory(ptr..ptr.try_add(Self::SIZE)?)?;
        Ok(Self { bytes })
    }

    pub fn location(&self) -> Pointer {
        self.bytes.start()
    }

    pub fn has_granted(&self) -> bool {
        !self.granted_front().is_null()
    }

    pub fn iter_granted<'a>(
        &self,
        source: &'a dyn MemorySource,
    ) -> LockRequestIter<'a> {
        LockRequestIter::new(self.granted_front(), source)
    }

    pub fn iter_pending<'a>(
        &self,
        source: &'a dyn MemorySource,
    ) -> LockRequestIter<'a> {
        LockRequestIter::new(self.pending_front(), source)
    }
}

/// One lock request in an intrusive doubly-linked request list.
pub struct LockRequest {
    bytes: OwnedBytes,
}

impl LockRequest {
    pub const SIZE: usize = 40;

    unpack_fields! {
        next: {Pointer, 0..8},
        prev: {Pointer, 8..16},
        locker_id: {u64, 16..24},
        mode: {u32, 24..28},
        status: {u32, 28..32},
        recursive_count: {u32, 32..36},
    }

    pub fn read(
        ptr: Pointer,
        source: &dyn MemorySource,
    ) -> Result<Self, Error> {
        let bytes = source.read_memory(ptr..ptr.try_add(Self::SIZE)?)?;
        Ok(Self { bytes })
    }

    pub fn lock_mode(&self) -> LockMode {
        LockMode::from_raw(self.mode())
    }

    pub fn request_status(&self) -> RequestStatus {
        RequestStatus::from_raw(self.status())
    }
}

pub struct LockRequestIter<'a> {
    source: &'a dyn MemorySource,
    next: Pointer,
    steps: usize,
    done: bool,
}

impl<'a> LockRequestIter<'a> {
    const MAX_CHAIN: usize = 10_000;

    fn new(front: Pointer, source: &'a dyn MemorySource) -> Self {
        Self {
            source,
            next: front,
            steps: 0,
            done: false,
        }
    }
}

impl<'a> Iterator for LockRequestIter<'a> {
    type Item = Result<LockRequest, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.next.is_null() {
            return None;
        }

        self.steps += 1;
        if self.steps > Self::MAX_CHAIN {
            self.done = true;
            return Some(Err(Error::LockChainTooLong(Self::MAX_CHAIN)));
        }

        match LockRequest::read(self.next, self.source) {
            Ok(request) => {
                self.next = request.next();
                Some(Ok(request))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockMode {
    None,
    IntentShared,
    IntentExclusive,
    Shared,
    Exclusive,
    Unknown(u32),
}

impl LockMode {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::None,
            1 => Self::IntentShared,
            2 => Self::IntentExclusive,
            3 => Self::Shared,
            4 => Self::Exclusive,
            raw => Self::Unknown(raw),
        }
    }
}

impl std::fmt::Display for LockMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "MODE_NONE"),
            Self::IntentShared => write!(f, "MODE_IS"),
            Self::IntentExclusive => write!(f, "MODE_IX"),
            Self::Shared => write!(f, "MODE_S"),
            Self::Exclusive => write!(f, "MODE_X"),
            Self::Unknown(raw) => write!(f, "MODE_{raw}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestStatus {
    New,
    Granted,
    Waiting,
    Converting,
    Unknown(u32),
}

impl RequestStatus {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::New,
            1 => Self::Granted,
            2 => Self::Waiting,
            3 => Self::Converting,
            raw => Self::Unknown(raw),
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "STATUS_NEW"),
            Self::Granted => write!(f, "STATUS_GRANTED"),
            Self::Waiting => write!(f, "STATUS_WAITING"),
            Self::Converting => write!(f, "STATUS_CONVERTING"),
            Self::Unknown(raw) => write!(f, "STATUS_{raw}"),
        }
    }
}

/// An opaque 64-bit resource identifier: a type tag in the top bits
/// and a hash or index in the rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceId {
    full_hash: u64,
}

/// Resource type names in the current numbering, where the
/// formerly-distinct top-level resources live under a single Global
/// type.
const RESOURCE_TYPE_NAMES: [&str; 6] =
    ["Invalid", "Global", "Database", "Collection", "Metadata", "Mutex"];

/// Resource type names before the Global consolidation.
const LEGACY_RESOURCE_TYPE_NAMES: [&str; 8] = [
    "Invalid",
    "ParallelBatchWriterMode",
    "ReplicationStateTransition",
    "Global",
    "Database",
    "Collection",
    "Metadata",
    "Mutex",
];

/// Names of the sub-resources of the Global resource type, indexed by
/// hash id.  Duplicated here because the string table in the
/// inspected binary is routinely optimized out.
const GLOBAL_RESOURCE_ID_NAMES: [&str; 4] = [
    "ParallelBatchWriterMode",
    "FeatureCompatibilityVersion",
    "ReplicationStateTransition",
    "Global",
];

/// Which numbering era the inspected binary uses.  The
/// ResourceGlobalId type exists exactly since the consolidation, so
/// its typeinfo tells the two eras apart.
fn resource_type_names(reader: &ContextReader) -> &'static [&'static str] {
    if reader
        .lookup_symbol("typeinfo for docstore::ResourceGlobalId")
        .is_some()
    {
        &RESOURCE_TYPE_NAMES
    } else {
        &LEGACY_RESOURCE_TYPE_NAMES
    }
}

impl ResourceId {
    /// Bits of the full hash reserved for the resource type tag.
    pub const TYPE_BITS: u32 = 4;

    pub fn new(full_hash: u64) -> Self {
        Self { full_hash }
    }

    pub fn full_hash(&self) -> u64 {
        self.full_hash
    }

    pub fn type_tag(&self) -> u8 {
        (self.full_hash >> (64 - Self::TYPE_BITS)) as u8
    }

    pub fn hash_id(&self) -> u64 {
        self.full_hash & (u64::MAX >> Self::TYPE_BITS)
    }

    /// Human-readable rendering, with whatever name suffixes the
    /// auxiliary registries can supply.  Every resolution failure is
    /// non-fatal and simply omits its suffix.
    pub fn describe(&self, reader: &ContextReader) -> String {
        let names = resource_type_names(reader);
        let kind = names
            .get(self.type_tag() as usize)
            .copied()
            .unwrap_or("Invalid");

        let mut ret = format!(
            "{{{}: {}, {}}}",
            self.full_hash,
            kind,
            self.hash_id()
        );

        match kind {
            "Mutex" => {
                let label = reader.context().resource_labels.try_insert(
                    self.full_hash,
                    || -> Result<_, Error> {
                        Ok(lookup_mutex_label(reader, self.hash_id()))
                    },
                );
                if let Ok(Some(label)) = label.map(Option::as_deref) {
                    ret.push_str(&format!(", {label}"));
                }
            }
            "Database" | "Collection" => {
                if let Some(nss) = lookup_resource_name(reader, self.full_hash)
                {
                    ret.push_str(&format!(", {nss}"));
                }
            }
            "Global" if names.len() == RESOURCE_TYPE_NAMES.len() => {
                if let Some(name) =
                    GLOBAL_RESOURCE_ID_NAMES.get(self.hash_id() as usize)
                {
                    ret.push_str(&format!(", {name}"));
                }
            }
            _ => {}
        }

        ret
    }
}

/// The label registry for mutex resources: a vector of strings
/// indexed by the resource's hash id.
fn lookup_mutex_label(reader: &ContextReader, hash_id: u64) -> Option<String> {
    let symbol =
        reader.lookup_symbol("docstore::ResourceLabelRegistry::instance")?;
    let labels = CxxVector::read(symbol.location.start, reader).ok()?;
    let index = usize::try_from(hash_id).ok()?;
    if index >= labels.num_elements(CxxString::SIZE) {
        return None;
    }
    CxxString::read(labels.element_ptr(index, CxxString::SIZE), reader).ok()
}

/// How one era of the server lays out a resource-name catalog entry.
struct CatalogLayout {
    symbol: &'static str,
    entry_stride: usize,
    res_id_offset: usize,
    name_offset: usize,
}

/// The catalogs mapping database/collection resource ids back to
/// namespace strings, newest first.  The resource catalog superseded
/// the per-collection catalog's resource map; the entry fields
/// traded places in the process.
const CATALOG_LAYOUTS: [CatalogLayout; 2] = [
    CatalogLayout {
        symbol: "docstore::ResourceCatalog::instance",
        entry_stride: 40,
        res_id_offset: 0,
        name_offset: 8,
    },
    CatalogLayout {
        symbol: "docstore::CollectionCatalog::instance",
        entry_stride: 40,
        res_id_offset: 32,
        name_offset: 0,
    },
];

/// Resolve a database or collection resource id to its namespace
/// string by consulting the first catalog present in the inspected
/// binary.  Later catalogs are only consulted when earlier ones do
/// not exist at all; an empty answer from a present catalog is final.
fn lookup_resource_name(
    reader: &ContextReader,
    full_hash: u64,
) -> Option<String> {
    let (layout, symbol) = CATALOG_LAYOUTS.iter().find_map(|layout| {
        reader
            .lookup_symbol(layout.symbol)
            .map(|symbol| (layout, symbol))
    })?;

    let entries = CxxVector::read(symbol.location.start, reader).ok()?;
    for entry in entries.iter_element_ptrs(layout.entry_stride) {
        let res_id = reader.read_u64(entry + layout.res_id_offset).ok()?;
        if res_id == full_hash {
            return CxxString::read(entry + layout.name_offset, reader).ok();
        }
    }
    None
}

/// Resolve a locker id to the registered name of its thread, cached
/// per process.
pub fn lookup_thread_name(
    reader: &ContextReader,
    locker_id: u64,
) -> Option<String> {
    const ENTRY_STRIDE: usize = 8 + CxxString::SIZE;

    let name = reader.context().thread_names.try_insert(
        locker_id,
        || -> Result<_, Error> {
            let Some(symbol) =
                reader.lookup_symbol("docstore::ThreadRegistry::instance")
            else {
                return Ok(None);
            };
            let Ok(entries) = CxxVector::read(symbol.location.start, reader)
            else {
                return Ok(None);
            };
            for entry in entries.iter_element_ptrs(ENTRY_STRIDE) {
                let Ok(tid) = reader.read_u64(entry) else {
                    return Ok(None);
                };
                if tid == locker_id {
                    return Ok(CxxString::read(entry + 8, reader).ok());
                }
            }
            Ok(None)
        },
    );

    name.ok().and_then(|name| name.clone())
}
