use std::{
    fs::File,
    ops::Range,
    path::{Path, PathBuf},
};

use elf::{endian::AnyEndian, ElfStream};

use crate::{Error, MemoryMapRegion, Pointer};

/// A named address range in the inspected process, harvested from the
/// ELF symbol tables of a file-backed mapping.
#[derive(Clone)]
pub struct Symbol {
    pub name: String,
    pub location: Range<Pointer>,
}

struct FileSymbol {
    name: String,
    location: Range<usize>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, location: Range<Pointer>) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }

    pub fn iter_symbols(
        region: &MemoryMapRegion,
    ) -> impl Iterator<Item = Symbol> {
        let region_address = region.mmap_start_address();
        region
            .name
            .clone()
            .into_iter()
            .map(|path| -> PathBuf { path.into() })
            .filter(|path| path.exists())
            .flat_map(|path| FileSymbol::collect_symbols(path).into_iter())
            .flatten()
            .map(move |file_symbol| {
                let FileSymbol { name, location } = file_symbol;
                let location = (region_address + location.start)
                    ..(region_address + location.end);
                Symbol { name, location }
            })
    }

    /// The demangled spelling of the symbol's name, falling back to
    /// the raw name for symbols that aren't mangled C++.
    pub fn demangled(&self) -> String {
        demangle(&self.name).unwrap_or_else(|| self.name.clone())
    }

    pub fn contains(&self, ptr: Pointer) -> bool {
        self.location.contains(&ptr)
    }

    pub fn matches(&self, search_name: &str) -> bool {
        self.name == search_name || self.demangled() == search_name
    }
}

pub fn demangle(mangled: &str) -> Option<String> {
    let sym = cpp_demangle::Symbol::new(mangled.as_bytes()).ok()?;
    sym.demangle(&cpp_demangle::DemangleOptions::default()).ok()
}

impl FileSymbol {
    fn collect_symbols(path: impl AsRef<Path>) -> Result<Vec<Self>, Error> {
        // The ElfStream API requires extra copying.  Ideally this
        // function would return an iterator, but the `symbol_table`
        // and `dynamic_symbol_table` methods take a mutable
        // reference, so the ElfStream needs to outlive the iterator
        // and the symbols must be collected before returning.
        let file_obj = File::open(path)?;
        let mut elf = ElfStream::<AnyEndian, _>::open_stream(&file_obj)?;

        let mut symbols = Vec::new();

        for i in 0..2 {
            let Some((table, names)) = if i == 0 {
                elf.symbol_table()
            } else {
                elf.dynamic_symbol_table()
            }?
            else {
                continue;
            };
            let symbol_iter = table
                .into_iter()
                .filter(|symbol| !symbol.is_undefined())
                .filter(|symbol| symbol.st_name > 0)
                .map(move |symbol| -> Result<_, Error> {
                    let name = names.get(symbol.st_name as usize)?.to_string();
                    let start = symbol.st_value as usize;
                    let len = symbol.st_size as usize;
                    let location = start..start + len;
                    Ok(FileSymbol { name, location })
                });

            for symbol in symbol_iter {
                symbols.push(symbol?);
            }
        }
        Ok(symbols)
    }
}
