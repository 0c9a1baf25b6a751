//! A page and every object it depends on, moved as one block
//!
//! Renumbering uses a fixed layout relative to an anchor `m` (the target's
//! object count plus one), with `k` embedded images:
//!
//! | object              | number        |
//! |---------------------|---------------|
//! | resources           | `m`           |
//! | content stream      | `m + 1`       |
//! | content length      | `m + 2`       |
//! | image `i`           | `m + 3 + i`   |
//! | page                | `m + 3 + k`   |
//! | image `i` length    | `m + 4 + k + i` |
//!
//! The block is reserved even for pages without images, so every number is
//! a function of `m` and the member's own index.

use std::io::{Read, Seek, Write};

use crate::content::simplify_content;
use crate::error::Result;
use super::document::{OutputDocument, SourceDocument};
use super::object::ReadObject;
use super::page::PageObject;
use super::stream::{CompressionLevel, StreamFilter};

#[derive(Debug, Clone)]
pub struct CompositeImage {
    page: PageObject,
}

impl CompositeImage {
    pub fn new(page: PageObject) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &PageObject {
        &self.page
    }

    pub fn number(&self) -> u32 {
        self.page.number()
    }

    pub fn image_count(&self) -> usize {
        self.page.resources().x_objects().len()
    }

    /// Number of objects the block occupies in the output
    pub fn object_count(&self) -> u32 {
        4 + 2 * self.image_count() as u32
    }

    /// Assign every member its number in the block anchored at `anchor`
    pub fn renumber(&mut self, anchor: u32) {
        let m = anchor;
        let k = self.image_count() as u32;

        self.page.contents_mut().move_to(m + 1, m + 2);
        self.page.resources_mut().move_to(m);
        for (i, image) in self.page.resources_mut().x_objects_mut().values_mut().enumerate() {
            let i = i as u32;
            image.move_to(m + 3 + i, m + 4 + k + i);
        }
        self.page.move_to(m + 3 + k);
    }

    /// Renumber into the next free block of `target`
    pub fn move_to<W: Write>(&mut self, target: &OutputDocument<W>) {
        self.renumber(target.object_count() + 1);
    }

    /// Level used when the content stream gets a new payload
    pub fn set_compression_level(&mut self, level: CompressionLevel) {
        self.page.contents_mut().set_compression_level(level);
    }

    /// Rewrite the content stream with simplified path data
    ///
    /// Streams with a filter other than FlateDecode are left alone.
    pub fn simplify(&mut self) -> Result<()> {
        let number = self.number();
        let contents = self.page.contents_mut();
        if contents.filter() == StreamFilter::Opaque {
            log::warn!("page {}: content stream {} is not FlateDecode, copied as is", number, contents.number());
            return Ok(());
        }

        let original = contents.decompressed_payload()?;
        let simplified = simplify_content(&original);
        if !simplified.residue.trim().is_empty() {
            log::warn!(
                "page {}: some content could not be parsed -- {:?}",
                number,
                simplified.residue
            );
        }
        log::debug!(
            "page {}: content {} -> {} bytes",
            number,
            original.len(),
            simplified.content.len()
        );
        contents.set_payload(&simplified.content)
    }

    /// Re-encode the content stream at the configured level without
    /// touching its operators
    pub fn recompress(&mut self) -> Result<()> {
        let contents = self.page.contents_mut();
        if contents.filter() == StreamFilter::Opaque || contents.payload().is_none() {
            return Ok(());
        }
        contents.recompress()
    }

    /// Write the whole block: content, resources, page, then each image
    ///
    /// Streams are followed by their length objects.
    pub fn write<W: Write>(&mut self, target: &mut OutputDocument<W>) -> Result<()> {
        self.page.contents_mut().write(target)?;
        self.page.resources_mut().write(target)?;
        self.page.write(target)?;
        for image in self.page.resources_mut().x_objects_mut().values_mut() {
            image.write(target)?;
        }
        Ok(())
    }
}

impl ReadObject for CompositeImage {
    fn read<R: Read + Seek>(source: &mut SourceDocument<R>, number: u32) -> Result<Self> {
        Ok(Self::new(source.get(number)?))
    }
}
