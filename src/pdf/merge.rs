//! Page merging
//!
//! A merge run copies selected pages from any number of source documents
//! into one output document. The header and the shared root, Pages and Info
//! objects come from the first source; every later source only contributes
//! pages.

use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::pages::PageSelection;
use super::document::{rewrite_page_tree, OutputDocument, SourceDocument, PAGES_OBJECT_NUMBER};
use super::object::IndirectObject;
use super::stream::CompressionLevel;

/// Info dictionary used when the first source has none
const DEFAULT_INFO: &[u8] = b"<< /Producer (pdf-slim) >>\n";

/// One input file and the pages to take from it
#[derive(Debug, Clone)]
pub struct MergeInput {
    pub path: PathBuf,
    pub pages: PageSelection,
}

impl MergeInput {
    /// Take every page of `path`
    pub fn all_pages(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pages: PageSelection::all(),
        }
    }
}

/// Options for merging PDFs
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Input files in the order their pages should appear
    pub inputs: Vec<MergeInput>,
    /// Output PDF file path
    pub output_path: PathBuf,
    /// DEFLATE level for rewritten content streams
    pub compression: CompressionLevel,
    /// Whether content streams are simplified
    pub optimize: bool,
}

/// What a finished merge produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    pub page_count: usize,
    pub object_count: u32,
}

/// Root, Pages and Info objects shared by every page of one output
#[derive(Debug, Clone)]
pub struct MergeSession {
    root: IndirectObject,
    pages: IndirectObject,
    info: IndirectObject,
}

impl MergeSession {
    /// Capture the shared objects of `source`
    pub fn capture<R: Read + Seek>(source: &mut SourceDocument<R>) -> Result<Self> {
        let root = source.root()?;
        let pages = source.pages_object()?;
        let info = match source.info()? {
            Some(info) => info,
            None => {
                log::debug!("{} has no /Info, using a default one", source.label());
                IndirectObject::new(0, DEFAULT_INFO.to_vec())
            }
        };
        Ok(Self { root, pages, info })
    }

    /// Write the Pages object (as object 1), then Info, then the root
    pub fn write<W: Write>(mut self, target: &mut OutputDocument<W>) -> Result<()> {
        rewrite_page_tree(&mut self.pages, target.pages())?;
        self.pages.move_to(PAGES_OBJECT_NUMBER);
        self.pages.write(target)?;

        self.info.move_to(target.object_count());
        self.info.write(target)?;

        self.root.replace_reference("/Pages", PAGES_OBJECT_NUMBER);
        self.root.move_to(target.object_count());
        self.root.write(target)
    }
}

/// Drives pages from source documents into one output document
pub struct DocumentAssembler<W: Write = BufWriter<File>> {
    output: OutputDocument<W>,
    session: Option<MergeSession>,
    compression: CompressionLevel,
    optimize: bool,
}

impl DocumentAssembler<BufWriter<File>> {
    /// Create the output file
    pub fn create(path: &Path, compression: CompressionLevel, optimize: bool) -> Result<Self> {
        Ok(Self::new(OutputDocument::create(path)?, compression, optimize))
    }
}

impl<W: Write> DocumentAssembler<W> {
    pub fn new(output: OutputDocument<W>, compression: CompressionLevel, optimize: bool) -> Self {
        Self {
            output,
            session: None,
            compression,
            optimize,
        }
    }

    /// Copy the pages at `indices` (in that order) from `source`
    ///
    /// The first source added also provides the header and the shared
    /// catalog objects.
    pub fn add_pages<R: Read + Seek>(&mut self, source: &mut SourceDocument<R>, indices: &[usize]) -> Result<()> {
        if self.session.is_none() {
            source.header()?.write(&mut self.output)?;
            self.session = Some(MergeSession::capture(source)?);
        }

        for &index in indices {
            log::info!("processing {}[{}]", source.label(), index);
            let mut image = source.composite_image(index)?;
            image.set_compression_level(self.compression);
            if self.optimize {
                image.simplify()?;
            } else if !self.compression.is_default() {
                image.recompress()?;
            }
            image.move_to(&self.output);
            image.write(&mut self.output)?;
        }
        Ok(())
    }

    /// Pages written so far
    pub fn page_count(&self) -> usize {
        self.output.pages().len()
    }

    /// Write the shared objects and the cross-reference table
    pub fn finish(mut self) -> Result<(W, MergeSummary)> {
        let session = self
            .session
            .take()
            .ok_or_else(|| Error::General("No pages were added".to_string()))?;
        session.write(&mut self.output)?;
        self.output.write_xref()?;

        let summary = MergeSummary {
            page_count: self.output.pages().len(),
            object_count: self.output.object_count(),
        };
        Ok((self.output.finish()?, summary))
    }
}

/// Merge the selected pages of several PDF files into one
///
/// # Example
///
/// ```no_run
/// use pdf_slim::pages::PageSelection;
/// use pdf_slim::pdf::{merge_pdfs, CompressionLevel, MergeInput, MergeOptions};
/// use std::path::PathBuf;
///
/// let options = MergeOptions {
///     inputs: vec![
///         MergeInput::all_pages("plot1.pdf"),
///         MergeInput {
///             path: PathBuf::from("plot2.pdf"),
///             pages: PageSelection::parse("2..0").unwrap(),
///         },
///     ],
///     output_path: PathBuf::from("merged.pdf"),
///     compression: CompressionLevel::Default,
///     optimize: true,
/// };
///
/// merge_pdfs(&options).expect("Failed to merge");
/// ```
pub fn merge_pdfs(options: &MergeOptions) -> Result<MergeSummary> {
    if options.inputs.is_empty() {
        return Err(Error::General("No input files provided".to_string()));
    }

    // Validate all input files exist
    for input in &options.inputs {
        if !input.path.exists() {
            return Err(Error::FileNotFound(input.path.clone()));
        }
    }

    log::info!("compression level : {}", options.compression);
    log::info!("optimization flag : {}", options.optimize);
    log::info!("output file name  : {}", options.output_path.display());

    let mut assembler = DocumentAssembler::create(&options.output_path, options.compression, options.optimize)?;
    for input in &options.inputs {
        let mut source = SourceDocument::open(&input.path)?;
        let indices = input.pages.resolve(source.page_count())?;
        assembler.add_pages(&mut source, &indices)?;
    }

    let (_, summary) = assembler.finish()?;
    log::info!(
        "wrote {} pages ({} objects) to {}",
        summary.page_count,
        summary.object_count,
        options.output_path.display()
    );
    Ok(summary)
}

/// First of `name_1.pdf` ... `name_99.pdf` next to `base` that does not exist
pub fn next_output_path(base: &Path) -> Result<PathBuf> {
    let text = base.to_string_lossy();
    let (stem, suffix) = match text.rfind(".pdf") {
        Some(pos) => (&text[..pos], &text[pos..]),
        None => (&text[..], ""),
    };

    let mut candidate = PathBuf::new();
    for i in 1..=99 {
        candidate = PathBuf::from(format!("{}_{}{}", stem, i, suffix));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(Error::General(format!(
        "failed to create a new filename (last candidate: {})",
        candidate.display()
    )))
}
