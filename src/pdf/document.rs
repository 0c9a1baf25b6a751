//! Source and output documents
//!
//! A [`SourceDocument`] owns an open container and its cross-reference table
//! and materializes objects on request. An [`OutputDocument`] owns the write
//! cursor, the cross-reference table being built and the list of pages
//! written so far.

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;

use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::error::{Error, Result};
use super::composite::CompositeImage;
use super::object::{find_reference, IndirectObject, ReadObject};
use super::page::PageObject;
use super::store::{ByteSink, ByteStore};
use super::xref::CrossReferenceTable;

/// Object number of the shared Pages object in every output document
pub const PAGES_OBJECT_NUMBER: u32 = 1;

lazy_static! {
    /// `/Kids [ 3 0 R 9 0 R ]` (group 1 is the reference list)
    static ref RE_KIDS: Regex = Regex::new(r"/Kids\s*\[\s*([\d\sR]*)\]").unwrap();

    /// `/Count 12` (group 1 is the number)
    static ref RE_COUNT: Regex = Regex::new(r"/Count\s+(\d+)").unwrap();

    static ref RE_PAGE_REF: Regex = Regex::new(r"(\d+)\s+\d+\s+R").unwrap();
}

/// A container opened for reading
pub struct SourceDocument<R = BufReader<File>> {
    label: String,
    store: ByteStore<R>,
    xref: CrossReferenceTable,
    trailer: Vec<u8>,
    pages: Vec<u32>,
}

impl SourceDocument<BufReader<File>> {
    /// Open a container file and read its page list
    pub fn open(path: &Path) -> Result<Self> {
        let store = ByteStore::open(path)?;
        Self::from_store(store, path.display().to_string())
    }
}

impl SourceDocument<Cursor<Vec<u8>>> {
    /// Read a container held in memory
    pub fn from_bytes(bytes: Vec<u8>, label: impl Into<String>) -> Result<Self> {
        Self::from_store(ByteStore::from_bytes(bytes), label)
    }
}

impl<R: Read + Seek> SourceDocument<R> {
    /// Read the cross-reference table, trailer and page list of `store`
    ///
    /// `label` names the document in log output (usually its path).
    pub fn from_store(mut store: ByteStore<R>, label: impl Into<String>) -> Result<Self> {
        let (xref, trailer) = CrossReferenceTable::read(&mut store)?;
        let mut doc = Self {
            label: label.into(),
            store,
            xref,
            trailer,
            pages: Vec::new(),
        };

        let pages_object = doc.pages_object()?;
        doc.pages = page_references(&pages_object)?;
        log::debug!("{}: {} objects, {} pages", doc.label, doc.xref.len(), doc.pages.len());
        Ok(doc)
    }

    /// Raw byte range of object `number`, including its `N 0 obj` line
    pub fn read_raw(&mut self, number: u32) -> Result<Vec<u8>> {
        let entry = *self.xref.entry(number).ok_or(Error::MissingObject(number))?;
        self.store.read_at(entry.offset, entry.length)
    }

    /// Materialize object `number` as `T`
    pub fn get<T: ReadObject>(&mut self, number: u32) -> Result<T> {
        T::read(self, number)
    }

    /// Materialize the object named by the first `key N G R` in `dict`
    ///
    /// Returns `Ok(None)` when the key carries no reference.
    pub fn resolve_reference<T: ReadObject>(&mut self, dict: &[u8], key: &str) -> Result<Option<T>> {
        match find_reference(dict, key) {
            Some((number, _)) => self.get(number).map(Some),
            None => Ok(None),
        }
    }

    /// The file header pseudo-object (object 0)
    pub fn header(&mut self) -> Result<IndirectObject> {
        let header: IndirectObject = self.get(0)?;
        if !header.is_header() {
            return Err(Error::Format(format!("{} does not start with a %PDF header", self.label)));
        }
        Ok(header)
    }

    /// The document catalog named by the trailer's `/Root`
    pub fn root(&mut self) -> Result<IndirectObject> {
        let trailer = self.trailer.clone();
        self.resolve_reference(&trailer, "/Root")?
            .ok_or_else(|| Error::Format(format!("trailer of {} has no /Root reference", self.label)))
    }

    /// The document information dictionary, if the trailer names one
    pub fn info(&mut self) -> Result<Option<IndirectObject>> {
        let trailer = self.trailer.clone();
        self.resolve_reference(&trailer, "/Info")
    }

    /// The Pages object named by the catalog's `/Pages`
    pub fn pages_object(&mut self) -> Result<IndirectObject> {
        let root = self.root()?;
        self.resolve_reference(root.data(), "/Pages")?
            .ok_or_else(|| Error::MissingReference {
                object: root.number(),
                key: "/Pages".to_string(),
            })
    }

    /// One page together with everything it depends on
    pub fn composite_image(&mut self, index: usize) -> Result<CompositeImage> {
        let number = *self.pages.get(index).ok_or(Error::PageOutOfRange {
            index: index as i64,
            count: self.pages.len(),
        })?;
        let page: PageObject = self.get(number)?;
        Ok(CompositeImage::new(page))
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Object numbers of the pages, in `/Kids` order
    pub fn page_numbers(&self) -> &[u32] {
        &self.pages
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn xref(&self) -> &CrossReferenceTable {
        &self.xref
    }
}

/// Object numbers listed in a Pages object's `/Kids` array
fn page_references(pages_object: &IndirectObject) -> Result<Vec<u32>> {
    let caps = RE_KIDS.captures(pages_object.data()).ok_or_else(|| {
        Error::Format(format!("Pages object {} has no /Kids array", pages_object.number()))
    })?;

    Ok(RE_PAGE_REF
        .captures_iter(&caps[1])
        .filter_map(|r| std::str::from_utf8(&r[1]).ok()?.parse().ok())
        .collect())
}

/// Replace the `/Kids` array and `/Count` of a Pages object
pub fn rewrite_page_tree(pages_object: &mut IndirectObject, kids: &[u32]) -> Result<()> {
    let mut data = pages_object.data().to_vec();

    let kids_span = RE_KIDS
        .captures(&data)
        .and_then(|caps| caps.get(1))
        .map(|m| m.range())
        .ok_or_else(|| {
            Error::Format(format!("Pages object {} has no /Kids array", pages_object.number()))
        })?;
    let list: String = kids.iter().map(|n| format!("{} 0 R ", n)).collect();
    data.splice(kids_span, list.into_bytes());

    let count_span = RE_COUNT.captures(&data).and_then(|caps| caps.get(1)).map(|m| m.range());
    if let Some(span) = count_span {
        data.splice(span, kids.len().to_string().into_bytes());
    }

    pages_object.set_data(data);
    Ok(())
}

/// A container being written
///
/// Objects are appended in write order and registered with the
/// cross-reference table as they go; the table itself is emitted by
/// [`write_xref`](Self::write_xref) once everything else is written.
pub struct OutputDocument<W: Write = BufWriter<File>> {
    sink: ByteSink<W>,
    xref: CrossReferenceTable,
    pages: Vec<u32>,
}

impl OutputDocument<BufWriter<File>> {
    /// Create (or truncate) the output file
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self::new(ByteSink::create(path)?))
    }
}

impl<W: Write> OutputDocument<W> {
    pub fn new(sink: ByteSink<W>) -> Self {
        Self {
            sink,
            xref: CrossReferenceTable::new(),
            pages: Vec::new(),
        }
    }

    /// Number of objects written so far (the header included)
    pub fn object_count(&self) -> u32 {
        self.xref.len() as u32
    }

    pub fn position(&self) -> u64 {
        self.sink.position()
    }

    pub fn xref(&self) -> &CrossReferenceTable {
        &self.xref
    }

    /// Object numbers of the pages written so far
    pub fn pages(&self) -> &[u32] {
        &self.pages
    }

    pub fn push_page(&mut self, number: u32) {
        self.pages.push(number);
    }

    /// Append a serialized object and register it under `number`
    pub fn append_object(&mut self, number: u32, bytes: &[u8]) -> Result<()> {
        let offset = self.sink.append(bytes)?;
        self.xref.register(offset, bytes.len() as u64, number);
        Ok(())
    }

    /// Emit the cross-reference table and trailer
    pub fn write_xref(&mut self) -> Result<()> {
        self.xref.write(&mut self.sink)
    }

    /// Flush and hand back the underlying writer
    pub fn finish(self) -> Result<W> {
        self.sink.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixture::{FixturePage, SourceFixture};

    #[test]
    fn test_open_reads_page_list() {
        let fixture = SourceFixture::build(&[FixturePage::square(0.0), FixturePage::square(2.0).with_images(1)]);
        let source = fixture.open();
        let expected: Vec<u32> = fixture.pages.iter().map(|p| p.page).collect();
        assert_eq!(source.page_numbers(), expected.as_slice());
        assert_eq!(source.page_count(), 2);
    }

    #[test]
    fn test_catalog_objects() {
        let fixture = SourceFixture::build(&[FixturePage::square(0.0)]);
        let mut source = fixture.open();

        assert!(source.header().unwrap().is_header());
        assert_eq!(source.root().unwrap().number(), fixture.root);
        assert_eq!(source.info().unwrap().map(|i| i.number()), Some(fixture.info));
        assert_eq!(source.pages_object().unwrap().number(), fixture.pages_object);
    }

    #[test]
    fn test_missing_object() {
        let fixture = SourceFixture::build(&[FixturePage::square(0.0)]);
        let mut source = fixture.open();
        let result = source.get::<IndirectObject>(9999);
        assert!(matches!(result, Err(Error::MissingObject(9999))));
    }

    #[test]
    fn test_composite_image_out_of_range() {
        let fixture = SourceFixture::build(&[FixturePage::square(0.0)]);
        let mut source = fixture.open();
        let result = source.composite_image(3);
        assert!(matches!(result, Err(Error::PageOutOfRange { index: 3, count: 1 })));
    }

    #[test]
    fn test_resolve_absent_reference() {
        let fixture = SourceFixture::build(&[FixturePage::square(0.0)]);
        let mut source = fixture.open();
        let found: Option<IndirectObject> = source.resolve_reference(b"<< /Type /Page >>", "/Contents").unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_rewrite_page_tree() {
        let mut pages = IndirectObject::new(
            7,
            b"<< /Type /Pages /Kids [ 3 0 R 9 0 R ] /Count 2 /MediaBox [0 0 842 595] >>\n".to_vec(),
        );
        rewrite_page_tree(&mut pages, &[2, 8, 14]).unwrap();
        assert_eq!(
            pages.data(),
            b"<< /Type /Pages /Kids [ 2 0 R 8 0 R 14 0 R ] /Count 3 /MediaBox [0 0 842 595] >>\n"
        );
    }

    #[test]
    fn test_rewrite_page_tree_without_kids() {
        let mut pages = IndirectObject::new(7, b"<< /Type /Pages /Count 0 >>\n".to_vec());
        assert!(matches!(rewrite_page_tree(&mut pages, &[2]), Err(Error::Format(_))));
    }

    #[test]
    fn test_output_registers_objects() {
        let mut output = OutputDocument::new(ByteSink::new(Vec::new()));
        output.append_object(0, b"%PDF-1.3\n").unwrap();
        output.append_object(2, b"2 0 obj\n5\nendobj\n").unwrap();
        output.push_page(2);

        assert_eq!(output.object_count(), 2);
        assert_eq!(output.pages(), &[2]);
        let entry = output.xref().entry(2).unwrap();
        assert_eq!((entry.offset, entry.length), (9, 17));
        assert_eq!(output.position(), 26);
    }
}
