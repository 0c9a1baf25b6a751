//! Error types for the pdf-slim library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the pdf-slim library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Malformed or missing structural marker (trailer, xref header, ...)
    #[error("Invalid document structure: {0}")]
    Format(String),

    /// Object body is neither a dictionary nor a bare number
    #[error("Object {object} does not contain a dictionary or a number")]
    Parse { object: u32 },

    /// Reference to an object the cross-reference table does not list
    #[error("Object {0} is not listed in the cross-reference table")]
    MissingObject(u32),

    /// A required `key N G R` reference is absent
    #[error("Object {object} has no {key} reference")]
    MissingReference { object: u32, key: String },

    /// FlateDecode payload failed to inflate
    #[error("Corrupt stream in object {object}: {source}")]
    CorruptStream {
        object: u32,
        #[source]
        source: std::io::Error,
    },

    /// Malformed page range syntax
    #[error("Invalid page specification: [{0}]")]
    InvalidPageSpecification(String),

    /// Page selector used against a document without pages
    #[error("Page {index} is out of range for a document with {count} pages")]
    PageOutOfRange { index: i64, count: usize },

    /// General error
    #[error("{0}")]
    General(String),
}
