//! PDF metadata extraction

use std::path::Path;

use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::error::{Error, Result};
use super::document::SourceDocument;

lazy_static! {
    static ref RE_TITLE: Regex = Regex::new(r"/Title\s*\(([^)]*)\)").unwrap();
    static ref RE_AUTHOR: Regex = Regex::new(r"/Author\s*\(([^)]*)\)").unwrap();
    static ref RE_PRODUCER: Regex = Regex::new(r"/Producer\s*\(([^)]*)\)").unwrap();
}

/// PDF metadata
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Number of entries in the cross-reference table
    pub object_count: usize,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
    /// Producing application (if present)
    pub producer: Option<String>,
}

/// Extract metadata from a PDF file
pub fn extract_metadata(path: &Path) -> Result<PdfMetadata> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let mut doc = SourceDocument::open(path)?;
    let info = doc.info()?;
    let field = |re: &Regex| {
        let info = info.as_ref()?;
        let caps = re.captures(info.data())?;
        Some(String::from_utf8_lossy(&caps[1]).into_owned())
    };

    Ok(PdfMetadata {
        page_count: doc.page_count(),
        object_count: doc.xref().len(),
        title: field(&RE_TITLE),
        author: field(&RE_AUTHOR),
        producer: field(&RE_PRODUCER),
    })
}

/// Count the number of pages in a PDF file
///
/// This is a quick operation: only the cross-reference table, the catalog
/// and the Pages object are read.
pub fn count_pages(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    Ok(SourceDocument::open(path)?.page_count())
}
