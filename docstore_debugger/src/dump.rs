use std::fmt::Write as _;

use memory_probe::MemorySource;

use crate::lock_manager::lookup_thread_name;
use crate::{
    ContextReader, DocumentView, ElementValue, Error, LockManagerView,
};

/// Plain-text renderers for decoded structures.  The host debugger
/// normally drives presentation itself through the summary strings
/// and child iterators; these renderers exist for interactive dumps
/// and for exercising the full decode tree.

pub fn dump_document(
    doc: &DocumentView,
    source: &dyn MemorySource,
) -> Result<String, Error> {
    let mut out = String::new();
    writeln!(out, "{}", doc.summary())?;
    write_document_fields(&mut out, doc, source, 1)?;
    Ok(out)
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

fn write_document_fields(
    out: &mut String,
    doc: &DocumentView,
    source: &dyn MemorySource,
    depth: usize,
) -> Result<(), Error> {
    for field in doc.fields(source)? {
        write!(out, "{}{:?}: ", indent(depth), field.name)?;
        write_value(out, &field.value, source, depth)?;
    }
    Ok(())
}

fn write_value(
    out: &mut String,
    value: &ElementValue,
    source: &dyn MemorySource,
    depth: usize,
) -> Result<(), Error> {
    match value {
        ElementValue::Document(doc) => {
            writeln!(out, "{}", doc.summary())?;
            write_document_fields(out, doc, source, depth + 1)?;
        }
        ElementValue::Array(arr) => {
            writeln!(out, "{}", arr.summary())?;
            for (index, element) in arr.elements(source)?.enumerate() {
                write!(out, "{}[{index}]: ", indent(depth + 1))?;
                write_value(out, &element, source, depth + 1)?;
            }
        }
        value => writeln!(out, "{value}")?,
    }
    Ok(())
}

/// Render the lock manager the way the server's own diagnostic dump
/// does: one line per held resource, followed by its granted and
/// pending requests.
pub fn dump_lock_manager(
    lock_mgr: &LockManagerView,
    reader: &ContextReader,
) -> Result<String, Error> {
    let mut out = String::new();
    writeln!(out, "{}", lock_mgr.summary(reader))?;

    for resource in lock_mgr.resources(reader)? {
        let resource = resource?;
        writeln!(out, "{}", resource.res_id.describe(reader))?;

        for request in resource.lock_head.iter_granted(reader) {
            write_lock_request(&mut out, "granted", &request?, reader)?;
        }
        for request in resource.lock_head.iter_pending(reader) {
            write_lock_request(&mut out, "pending", &request?, reader)?;
        }
    }

    Ok(out)
}

fn write_lock_request(
    out: &mut String,
    queue: &str,
    request: &crate::LockRequest,
    reader: &ContextReader,
) -> Result<(), Error> {
    write!(
        out,
        "  {queue}: {} ({}) by locker {}",
        request.lock_mode(),
        request.request_status(),
        request.locker_id(),
    )?;
    if let Some(name) = lookup_thread_name(reader, request.locker_id()) {
        write!(out, " ({name:?})")?;
    }
    writeln!(out, ", count {}", request.recursive_count())?;
    Ok(())
}
