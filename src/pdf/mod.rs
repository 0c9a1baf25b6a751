//! Object and cross-reference engine
//!
//! Reads indirect objects lazily from source containers, renumbers each page
//! with its dependents into a dense block of the output, and rebuilds the
//! cross-reference table and trailer.

pub mod composite;
pub mod document;
pub mod merge;
pub mod metadata;
pub mod object;
pub mod page;
pub mod store;
pub mod stream;
pub mod xref;

#[cfg(test)]
#[path = "../../tests/common/mod.rs"]
pub(crate) mod fixture;

// Re-export commonly used items
pub use composite::CompositeImage;
pub use document::{OutputDocument, SourceDocument, PAGES_OBJECT_NUMBER};
pub use merge::{merge_pdfs, next_output_path, DocumentAssembler, MergeInput, MergeOptions, MergeSession, MergeSummary};
pub use metadata::{count_pages, extract_metadata, PdfMetadata};
pub use object::{IndirectObject, ReadObject};
pub use page::{PageObject, ResourceObject};
pub use store::{ByteSink, ByteStore};
pub use stream::{CompressionLevel, StreamFilter, StreamObject};
pub use xref::{CrossReferenceTable, XrefEntry};

#[cfg(test)]
impl fixture::SourceFixture {
    /// Open the generated bytes as a source document
    pub(crate) fn open(&self) -> SourceDocument<std::io::Cursor<Vec<u8>>> {
        SourceDocument::from_bytes(self.bytes.clone(), "fixture").unwrap()
    }
}
