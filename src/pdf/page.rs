//! Page and resource dictionaries

use std::io::{Read, Seek, Write};

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::error::{Error, Result};
use super::document::{OutputDocument, SourceDocument, PAGES_OBJECT_NUMBER};
use super::object::{IndirectObject, ReadObject};
use super::stream::StreamObject;

lazy_static! {
    /// `/XObject << ... >>` sub-dictionary (group 1 is the inner dictionary)
    static ref RE_XOBJECT: Regex = Regex::new(r"/XObject\s*(<<[^<>]*>>)").unwrap();

    /// `/x5 5 0 R` entries inside the XObject sub-dictionary
    static ref RE_XOBJECT_ENTRY: Regex = Regex::new(r"(/\w+)\s+(\d+)\s+\d+\s+R").unwrap();
}

/// A resource dictionary and the image XObjects it names
#[derive(Debug, Clone)]
pub struct ResourceObject {
    object: IndirectObject,
    x_objects: IndexMap<String, StreamObject>,
}

impl ResourceObject {
    pub fn number(&self) -> u32 {
        self.object.number()
    }

    pub fn object(&self) -> &IndirectObject {
        &self.object
    }

    /// Embedded images keyed by resource name, in dictionary order
    pub fn x_objects(&self) -> &IndexMap<String, StreamObject> {
        &self.x_objects
    }

    pub fn x_objects_mut(&mut self) -> &mut IndexMap<String, StreamObject> {
        &mut self.x_objects
    }

    pub fn move_to(&mut self, number: u32) {
        self.object.move_to(number);
    }

    /// Rebuild the `/XObject` sub-dictionary from the images' current numbers
    pub fn refresh_references(&mut self) {
        if self.x_objects.is_empty() {
            return;
        }

        let entries: Vec<String> = self
            .x_objects
            .iter()
            .map(|(name, image)| format!("{} {} 0 R", name, image.number()))
            .collect();
        let replacement = format!("<< {} >>", entries.join(" "));

        let span = RE_XOBJECT
            .captures(self.object.data())
            .and_then(|caps| caps.get(1))
            .map(|m| m.range());
        if let Some(span) = span {
            let mut data = self.object.data().to_vec();
            data.splice(span, replacement.into_bytes());
            self.object.set_data(data);
        }
    }

    /// Serialize with up-to-date XObject references
    pub fn to_canonical_bytes(&mut self) -> Vec<u8> {
        self.refresh_references();
        self.object.to_canonical_bytes()
    }

    /// Write the resource dictionary itself (not its images)
    pub fn write<W: Write>(&mut self, target: &mut OutputDocument<W>) -> Result<()> {
        self.refresh_references();
        self.object.write(target)
    }
}

impl ReadObject for ResourceObject {
    fn read<R: Read + Seek>(source: &mut SourceDocument<R>, number: u32) -> Result<Self> {
        let object: IndirectObject = source.get(number)?;

        let entries: Vec<(String, u32)> = match RE_XOBJECT.captures(object.data()) {
            Some(caps) => RE_XOBJECT_ENTRY
                .captures_iter(&caps[1])
                .filter_map(|entry| {
                    let name = String::from_utf8(entry[1].to_vec()).ok()?;
                    let target = std::str::from_utf8(&entry[2]).ok()?.parse().ok()?;
                    Some((name, target))
                })
                .collect(),
            None => Vec::new(),
        };

        let mut x_objects = IndexMap::with_capacity(entries.len());
        for (name, target) in entries {
            let image: StreamObject = source.get(target)?;
            x_objects.insert(name, image);
        }

        Ok(Self { object, x_objects })
    }
}

/// A page dictionary with its content stream and resource dictionary
#[derive(Debug, Clone)]
pub struct PageObject {
    object: IndirectObject,
    contents: StreamObject,
    resources: ResourceObject,
}

impl PageObject {
    pub fn number(&self) -> u32 {
        self.object.number()
    }

    pub fn object(&self) -> &IndirectObject {
        &self.object
    }

    pub fn contents(&self) -> &StreamObject {
        &self.contents
    }

    pub fn contents_mut(&mut self) -> &mut StreamObject {
        &mut self.contents
    }

    pub fn resources(&self) -> &ResourceObject {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceObject {
        &mut self.resources
    }

    pub fn move_to(&mut self, number: u32) {
        self.object.move_to(number);
    }

    /// Re-point `/Contents`, `/Resources` and `/Parent` at the current
    /// numbers of the objects they name
    pub fn refresh_references(&mut self) {
        self.object.replace_reference("/Contents", self.contents.number());
        self.object.replace_reference("/Resources", self.resources.number());
        self.object.replace_reference("/Parent", PAGES_OBJECT_NUMBER);
    }

    /// Serialize with up-to-date references
    pub fn to_canonical_bytes(&mut self) -> Vec<u8> {
        self.refresh_references();
        self.object.to_canonical_bytes()
    }

    /// Write the page dictionary and record it in the target's page list
    ///
    /// Dependents are written separately, see
    /// [`CompositeImage::write`](super::composite::CompositeImage::write).
    pub fn write<W: Write>(&mut self, target: &mut OutputDocument<W>) -> Result<()> {
        target.push_page(self.number());
        self.refresh_references();
        self.object.write(target)
    }
}

impl ReadObject for PageObject {
    fn read<R: Read + Seek>(source: &mut SourceDocument<R>, number: u32) -> Result<Self> {
        let object: IndirectObject = source.get(number)?;
        let dict = object.data().to_vec();

        let missing = |key: &str| Error::MissingReference {
            object: number,
            key: key.to_string(),
        };
        let contents = source
            .resolve_reference::<StreamObject>(&dict, "/Contents")?
            .ok_or_else(|| missing("/Contents"))?;
        let resources = source
            .resolve_reference::<ResourceObject>(&dict, "/Resources")?
            .ok_or_else(|| missing("/Resources"))?;

        Ok(Self { object, contents, resources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixture::{FixturePage, SourceFixture};

    #[test]
    fn test_read_page_with_dependents() {
        let fixture = SourceFixture::build(&[FixturePage::square(0.0).with_images(2)]);
        let mut source = fixture.open();
        let number = source.page_numbers()[0];

        let page: PageObject = source.get(number).unwrap();
        assert_eq!(page.number(), number);
        assert_eq!(page.contents().number(), fixture.pages[0].contents);
        assert_eq!(page.resources().number(), fixture.pages[0].resources);

        let names: Vec<&str> = page.resources().x_objects().keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["/x0", "/x1"]);
        let image_numbers: Vec<u32> = page.resources().x_objects().values().map(|i| i.number()).collect();
        assert_eq!(image_numbers, fixture.pages[0].images);
    }

    #[test]
    fn test_resources_without_xobjects() {
        let fixture = SourceFixture::build(&[FixturePage::square(0.0)]);
        let mut source = fixture.open();
        let resources: ResourceObject = source.get(fixture.pages[0].resources).unwrap();
        assert!(resources.x_objects().is_empty());
    }

    #[test]
    fn test_page_references_follow_renumbering() {
        let fixture = SourceFixture::build(&[FixturePage::square(0.0).with_images(1)]);
        let mut source = fixture.open();
        let mut page: PageObject = source.get(source.page_numbers()[0]).unwrap();

        page.contents_mut().move_to(41, 42);
        page.resources_mut().move_to(40);
        for image in page.resources_mut().x_objects_mut().values_mut() {
            image.move_to(43, 45);
        }
        page.move_to(44);

        assert_eq!(page.object().reference("/Contents"), Some(fixture.pages[0].contents));
        let text = String::from_utf8(page.to_canonical_bytes()).unwrap();
        assert!(text.starts_with("44 0 obj\n"));
        assert!(text.contains("/Contents 41 0 R"));
        assert!(text.contains("/Resources 40 0 R"));
        assert!(text.contains("/Parent 1 0 R"));

        let resources = String::from_utf8(page.resources_mut().to_canonical_bytes()).unwrap();
        assert!(resources.contains("/XObject << /x0 43 0 R >>"));
    }

    #[test]
    fn test_page_without_contents() {
        let fixture = SourceFixture::build(&[FixturePage::square(0.0)]);
        let mut source = fixture.open();
        // the catalog has no /Contents key
        let result = source.get::<PageObject>(fixture.root);
        assert!(matches!(result, Err(Error::MissingReference { ref key, .. }) if key == "/Contents"));
    }
}
