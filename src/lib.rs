//! PDF Slim Library
//!
//! Merges pages from plotter-generated PDF files into one document while
//! shrinking their vector path data.
//! This library provides functionality to:
//! - Read objects lazily through the cross-reference table
//! - Renumber each page with its content stream, resources and images into
//!   a dense block of a new document
//! - Simplify content streams (merge adjacent polygons, drop collinear
//!   vertices and repeated colour operators)
//! - Recompress content streams at a chosen DEFLATE level
//! - Parse page selectors such as `0,5...2,8..-1`
//!
//! # Example
//!
//! ```no_run
//! use pdf_slim::pdf::{merge_pdfs, CompressionLevel, MergeInput, MergeOptions};
//! use std::path::PathBuf;
//!
//! let options = MergeOptions {
//!     inputs: vec![
//!         MergeInput::all_pages("1. map.pdf"),
//!         MergeInput::all_pages("2. profile.pdf"),
//!     ],
//!     output_path: PathBuf::from("merged.pdf"),
//!     compression: CompressionLevel::Level(9),
//!     optimize: true,
//! };
//!
//! merge_pdfs(&options).expect("Failed to merge PDFs");
//! ```

pub mod content;
pub mod error;
pub mod pages;
pub mod pdf;

// Re-export commonly used items
pub use error::{Error, Result};
