//! Synthetic source documents for tests
//!
//! Builds documents shaped like the ones the merge tool consumes: every stream
//! has an indirect `/Length` object, every page has its own content stream and
//! resource dictionary, and the shared Pages/Catalog/Info objects are written
//! after the pages.
#![allow(dead_code)]

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

pub const HEADER: &[u8] = b"%PDF-1.3\n%\xe2\xe3\xcf\xd3\n";

/// Description of one page to generate
#[derive(Debug, Clone)]
pub struct FixturePage {
    pub content: String,
    pub images: usize,
    pub compress: bool,
}

impl FixturePage {
    pub fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
            images: 0,
            compress: true,
        }
    }

    /// A filled unit square at `x`, drawn the way the plotting tool does it
    pub fn square(x: f64) -> Self {
        Self::new(&format!(
            "q\n0 0 1 rg\n{} 0 m {} 0 l {} 1 l {} 1 l h\nB\nQ\n",
            x,
            x + 1.0,
            x + 1.0,
            x
        ))
    }

    pub fn with_images(mut self, images: usize) -> Self {
        self.images = images;
        self
    }

    pub fn uncompressed(mut self) -> Self {
        self.compress = false;
        self
    }
}

/// Object numbers assigned to one generated page
#[derive(Debug, Clone)]
pub struct FixturePageNumbers {
    pub page: u32,
    pub contents: u32,
    pub content_length: u32,
    pub resources: u32,
    pub images: Vec<u32>,
}

/// A generated document and the numbers of its objects
#[derive(Debug, Clone)]
pub struct SourceFixture {
    pub bytes: Vec<u8>,
    pub pages_object: u32,
    pub root: u32,
    pub info: u32,
    pub pages: Vec<FixturePageNumbers>,
}

impl SourceFixture {
    pub fn build(pages: &[FixturePage]) -> Self {
        let mut writer = FixtureWriter::new();
        let pages_object = 1;
        let root = 2;
        let info = 3;
        let mut next = 4;
        let mut numbers = Vec::new();

        for (index, page) in pages.iter().enumerate() {
            let assigned = FixturePageNumbers {
                page: next,
                contents: next + 1,
                content_length: next + 2,
                resources: next + 3,
                images: (0..page.images as u32).map(|i| next + 4 + 2 * i).collect(),
            };
            next += 4 + 2 * page.images as u32;

            writer.object(
                assigned.page,
                &format!(
                    "<< /Type /Page /Parent {} 0 R /Contents {} 0 R /Resources {} 0 R >>\n",
                    pages_object, assigned.contents, assigned.resources
                ),
            );

            if page.compress {
                writer.stream(
                    assigned.contents,
                    assigned.content_length,
                    "/Filter /FlateDecode",
                    &deflate(page.content.as_bytes()),
                );
            } else {
                writer.stream(assigned.contents, assigned.content_length, "", page.content.as_bytes());
            }

            let xobjects: Vec<String> = assigned
                .images
                .iter()
                .enumerate()
                .map(|(i, n)| format!("/x{} {} 0 R", i, n))
                .collect();
            let resources = if xobjects.is_empty() {
                "<< /ProcSet [/PDF] >>\n".to_string()
            } else {
                format!("<< /ProcSet [/PDF /ImageC] /XObject << {} >> >>\n", xobjects.join(" "))
            };
            writer.object(assigned.resources, &resources);

            for (i, &image) in assigned.images.iter().enumerate() {
                let shade = (index * 16 + i) as u8;
                let pixels = [shade; 12];
                writer.stream(
                    image,
                    image + 1,
                    "/Type /XObject /Subtype /Image /Width 2 /Height 2 /ColorSpace /DeviceRGB \
                     /BitsPerComponent 8 /Filter /FlateDecode",
                    &deflate(&pixels),
                );
            }

            numbers.push(assigned);
        }

        let kids: Vec<String> = numbers.iter().map(|p| format!("{} 0 R", p.page)).collect();
        writer.object(
            pages_object,
            &format!(
                "<< /Type /Pages /Kids [ {} ] /Count {} /MediaBox [0 0 842 595] >>\n",
                kids.join(" "),
                numbers.len()
            ),
        );
        writer.object(root, &format!("<< /Type /Catalog /Pages {} 0 R >>\n", pages_object));
        writer.object(info, "<< /Title (Fixture) /Author (Plotter) /Producer (fixture) >>\n");

        Self {
            bytes: writer.finish(next, root, info),
            pages_object,
            root,
            info,
            pages: numbers,
        }
    }
}

/// Writes objects and remembers where each one starts
pub struct FixtureWriter {
    buf: Vec<u8>,
    offsets: Vec<(u32, usize)>,
}

impl FixtureWriter {
    pub fn new() -> Self {
        Self {
            buf: HEADER.to_vec(),
            offsets: Vec::new(),
        }
    }

    pub fn object(&mut self, number: u32, body: &str) {
        self.offsets.push((number, self.buf.len()));
        self.buf.extend_from_slice(format!("{} 0 obj\n", number).as_bytes());
        self.buf.extend_from_slice(body.as_bytes());
        self.buf.extend_from_slice(b"endobj\n");
    }

    pub fn stream(&mut self, number: u32, length_number: u32, dict: &str, payload: &[u8]) {
        self.offsets.push((number, self.buf.len()));
        self.buf.extend_from_slice(
            format!("{} 0 obj\n<< /Length {} 0 R {} >>\nstream\n", number, length_number, dict).as_bytes(),
        );
        self.buf.extend_from_slice(payload);
        self.buf.extend_from_slice(b"\nendstream\nendobj\n");
        self.object(length_number, &format!("   {}\n", payload.len()));
    }

    /// Append the xref section and trailer; `size` is one past the highest
    /// object number
    pub fn finish(self, size: u32, root: u32, info: u32) -> Vec<u8> {
        let trailer = format!("<< /Size {} /Root {} 0 R /Info {} 0 R >>", size, root, info);
        self.finish_with_trailer(size, &trailer)
    }

    pub fn finish_with_trailer(mut self, size: u32, trailer: &str) -> Vec<u8> {
        let xref = self.buf.len();
        self.offsets.sort_by_key(|&(n, _)| n);

        self.buf.extend_from_slice(format!("xref\n0 {}\n", size).as_bytes());
        self.buf.extend_from_slice(b"0000000000 65535 f \n");
        for n in 1..size {
            let offset = self
                .offsets
                .iter()
                .find(|&&(m, _)| m == n)
                .map(|&(_, o)| o)
                .unwrap_or_else(|| panic!("object {} was never written", n));
            self.buf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        self.buf.extend_from_slice(format!("trailer\n{}\n", trailer).as_bytes());
        self.buf.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref).as_bytes());
        self.buf
    }
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn inflate(data: &[u8]) -> Vec<u8> {
    use std::io::Read;
    let mut out = Vec::new();
    flate2::read::ZlibDecoder::new(data).read_to_end(&mut out).unwrap();
    out
}
