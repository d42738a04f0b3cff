use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::ops::Range;

use elsa::FrozenMap;
use lru::LruCache;
use memory_probe::{
    ByteOrder, MemorySource, OwnedBytes, Pointer, Symbol,
};

use crate::decoration::DecorationSlotTypes;

/// Caches spanning the lifetime of one inspected process.  Only
/// values that are stable for that lifetime belong here: the set of
/// decoration slots for a type never changes once the program is
/// running, and neither do resource labels or thread names of
/// registered threads.  Attaching to a different process or
/// executable means constructing a fresh context; that is the entire
/// invalidation story.
///
/// Keys carry the owning type name where relevant, so that two
/// decorated types with identical slot indices cannot collide.
#[derive(Default)]
pub struct InspectionContext {
    pub(crate) decoration_slot_types: FrozenMap<String, Box<DecorationSlotTypes>>,
    pub(crate) resource_labels: FrozenMap<u64, Box<Option<String>>>,
    pub(crate) thread_names: FrozenMap<u64, Box<Option<String>>>,
}

impl InspectionContext {
    const WINDOW_POOL_SIZE: usize = 16;

    pub fn new() -> Self {
        Default::default()
    }

    /// Pair the context with a memory source for the duration of one
    /// format request.
    pub fn reader<'a>(
        &'a self,
        source: &'a dyn MemorySource,
    ) -> ContextReader<'a> {
        ContextReader {
            context: self,
            source,
            window_pool: RefCell::new(LruCache::new(
                NonZeroUsize::new(Self::WINDOW_POOL_SIZE).unwrap(),
            )),
        }
    }
}

/// A `MemorySource` that consults the process-wide caches and pools
/// recently fetched windows.
///
/// The pool makes nested-document decoding cheap: when a document's
/// window has been fetched, decoding any value inside it is served
/// from the pooled bytes instead of issuing another read against the
/// inspected process.  Unlike the context's caches, the pool lives
/// only for one format request; memory contents are only guaranteed
/// stable while the inspected process remains stopped.
pub struct ContextReader<'a> {
    context: &'a InspectionContext,
    source: &'a dyn MemorySource,
    window_pool: RefCell<LruCache<Pointer, OwnedBytes>>,
}

impl<'a> ContextReader<'a> {
    /// Reads smaller than this bypass the pool.  Length prefixes and
    /// single pointers are not worth an eviction.
    const MIN_POOLED_LEN: usize = 5;

    pub fn context(&self) -> &'a InspectionContext {
        self.context
    }

    pub fn source(&self) -> &'a dyn MemorySource {
        self.source
    }

    fn pooled_window(&self, range: &Range<Pointer>) -> Option<OwnedBytes> {
        let mut pool = self.window_pool.borrow_mut();
        let key = pool
            .iter()
            .find(|(_, window)| {
                window.start() <= range.start && range.end <= window.end()
            })
            .map(|(key, _)| *key)?;
        let window = pool.get(&key)?;
        let bytes = window.subrange(range.clone()).ok()?.bytes().to_vec();
        Some(OwnedBytes::new(range.start, bytes))
    }
}

impl MemorySource for ContextReader<'_> {
    fn read_memory(
        &self,
        range: Range<Pointer>,
    ) -> Result<OwnedBytes, memory_probe::Error> {
        if let Some(window) = self.pooled_window(&range) {
            return Ok(window);
        }
        let window = self.source.read_memory(range.clone())?;
        if window.len() >= Self::MIN_POOLED_LEN {
            self.window_pool
                .borrow_mut()
                .put(range.start, window.clone());
        }
        Ok(window)
    }

    fn lookup_symbol(&self, name: &str) -> Option<Symbol> {
        self.source.lookup_symbol(name)
    }

    fn symbol_at(&self, location: Pointer) -> Option<String> {
        self.source.symbol_at(location)
    }

    fn byte_order(&self) -> ByteOrder {
        self.source.byte_order()
    }
}
