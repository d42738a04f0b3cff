use memory_probe::{MemorySource, OwnedBytes, Pointer};

use crate::document::FieldIter;
use crate::{DisplayHint, DocumentView, ElementValue, Error};

/// An encoded array: byte-for-byte the same layout as a document,
/// reinterpreted so that callers see an ordered sequence of values
/// instead of named fields.  The walk itself is the document walk;
/// only the presentation contract differs.
#[derive(Clone, Debug)]
pub struct ArrayView(DocumentView);

impl ArrayView {
    pub fn read(
        ptr: Pointer,
        source: &dyn MemorySource,
    ) -> Result<Self, Error> {
        Ok(Self(DocumentView::read(ptr, source)?))
    }

    pub fn from_bytes(window: OwnedBytes) -> Self {
        Self(DocumentView::from_bytes(window))
    }

    pub fn objdata(&self) -> Pointer {
        self.0.objdata()
    }

    pub fn objsize(&self) -> i32 {
        self.0.objsize()
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_valid()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn display_hint(&self) -> DisplayHint {
        DisplayHint::Sequence
    }

    pub fn summary(&self) -> String {
        self.0.summary_as("Array", "array")
    }

    pub fn as_document(&self) -> &DocumentView {
        &self.0
    }

    pub fn elements<'a>(
        &'a self,
        source: &dyn MemorySource,
    ) -> Result<ElementIter<'a>, Error> {
        Ok(ElementIter(self.0.fields(source)?))
    }
}

impl From<DocumentView> for ArrayView {
    fn from(doc: DocumentView) -> Self {
        Self(doc)
    }
}

pub struct ElementIter<'a>(FieldIter<'a>);

impl<'a> Iterator for ElementIter<'a> {
    type Item = ElementValue;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|field| field.value)
    }
}
