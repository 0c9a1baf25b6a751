//! Indirect objects
//!
//! An object body is kept as the raw dictionary (or integer) text it was read
//! with. References to other objects are found and rewritten textually, which
//! keeps every byte we do not touch identical to the source.

use std::io::{Read, Seek, Write};
use std::ops::Range;

use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::error::{Error, Result};
use super::document::{OutputDocument, SourceDocument};

lazy_static! {
    /// `/Key 12 0 R` (group 1 is the key, group 2 the object number)
    static ref RE_REFERENCE: Regex = Regex::new(r"(/\w+)\s+(\d+)\s+\d+\s+R").unwrap();
}

/// Types that can be materialized from a source document's byte range
pub trait ReadObject: Sized {
    /// Read object `number` from `source`, resolving whatever it depends on
    fn read<R: Read + Seek>(source: &mut SourceDocument<R>, number: u32) -> Result<Self>;
}

/// A numbered object holding its dictionary (or bare integer) text
///
/// Object 0 of a document is special: its byte range is the file header
/// (`%PDF-1.x` plus the binary comment line) and is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndirectObject {
    number: u32,
    data: Vec<u8>,
}

impl IndirectObject {
    pub fn new(number: u32, data: Vec<u8>) -> Self {
        Self { number, data }
    }

    /// Parse the raw byte range of object `number`
    ///
    /// The `N 0 obj` line is discarded and the body must start with a
    /// balanced `<< ... >>` dictionary or a bare integer. Returns the object
    /// together with whatever follows the value (a stream section, `endobj`).
    pub fn parse(number: u32, raw: &[u8]) -> Result<(Self, &[u8])> {
        if raw.starts_with(b"%PDF") {
            return Ok((Self::new(number, raw.to_vec()), &[]));
        }

        let body = skip_line(raw);
        let len = scan_value(body).ok_or(Error::Parse { object: number })?;
        Ok((Self::new(number, body[..len].to_vec()), &body[len..]))
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
    }

    /// Whether this is a document's header pseudo-object
    pub fn is_header(&self) -> bool {
        self.number == 0 && self.data.starts_with(b"%PDF")
    }

    /// Give the object a new identity in the document it is moving to
    pub fn move_to(&mut self, number: u32) {
        self.number = number;
    }

    /// Serialize as `N 0 obj\n<body>endobj\n` (the header verbatim)
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        if self.is_header() {
            return self.data.clone();
        }

        let mut buf = format!("{} 0 obj\n", self.number).into_bytes();
        buf.extend_from_slice(&self.data);
        buf.extend_from_slice(b"endobj\n");
        buf
    }

    /// Append to `target` and register the written range in its xref table
    pub fn write<W: Write>(&self, target: &mut OutputDocument<W>) -> Result<()> {
        target.append_object(self.number, &self.to_canonical_bytes())
    }

    /// Object number of the first `key N G R` reference, if any
    pub fn reference(&self, key: &str) -> Option<u32> {
        find_reference(&self.data, key).map(|(number, _)| number)
    }

    /// Re-point the first `key N G R` reference at object `number`
    ///
    /// Leaves the body untouched when the key has no reference.
    pub fn replace_reference(&mut self, key: &str, number: u32) {
        if let Some((_, span)) = find_reference(&self.data, key) {
            self.data.splice(span, number.to_string().into_bytes());
        }
    }

    /// Value of a bare-integer body (length objects)
    pub fn integer_value(&self) -> Option<u64> {
        let span = integer_span(&self.data)?;
        std::str::from_utf8(&self.data[span]).ok()?.parse().ok()
    }

    /// Replace the integer of a bare-integer body, keeping its whitespace
    pub fn set_integer_value(&mut self, value: u64) {
        match integer_span(&self.data) {
            Some(span) => {
                self.data.splice(span, value.to_string().into_bytes());
            }
            None => self.data = format!("{}\n", value).into_bytes(),
        }
    }
}

impl ReadObject for IndirectObject {
    fn read<R: Read + Seek>(source: &mut SourceDocument<R>, number: u32) -> Result<Self> {
        let raw = source.read_raw(number)?;
        Ok(Self::parse(number, &raw)?.0)
    }
}

/// Length of the value at the start of `buf`
///
/// Accepts either a balanced `<< ... >>` dictionary followed by optional
/// whitespace, or an integer surrounded by optional whitespace.
pub fn scan_value(buf: &[u8]) -> Option<usize> {
    scan_dictionary(buf).or_else(|| scan_integer(buf))
}

fn scan_dictionary(buf: &[u8]) -> Option<usize> {
    if !buf.starts_with(b"<<") {
        return None;
    }

    let mut depth = 0usize;
    let mut i = 0;
    while i < buf.len() {
        match buf[i] {
            b'<' if buf.get(i + 1) == Some(&b'<') => {
                depth += 1;
                i += 2;
            }
            b'>' if buf.get(i + 1) == Some(&b'>') => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return Some(i + skip_whitespace(&buf[i..]));
                }
            }
            // hex string
            b'<' => {
                let close = buf[i + 1..].iter().position(|&b| b == b'<' || b == b'>')?;
                if buf[i + 1 + close] != b'>' {
                    return None;
                }
                i += close + 2;
            }
            b'>' => return None,
            _ => i += 1,
        }
    }
    None
}

fn scan_integer(buf: &[u8]) -> Option<usize> {
    let lead = skip_whitespace(buf);
    let digits = count_digits(&buf[lead..]);
    if digits == 0 {
        return None;
    }
    let end = lead + digits;
    Some(end + skip_whitespace(&buf[end..]))
}

/// Find the first `key N G R` reference in `dict`
///
/// Returns the referenced object number and the byte span of `N`.
pub fn find_reference(dict: &[u8], key: &str) -> Option<(u32, Range<usize>)> {
    RE_REFERENCE
        .captures_iter(dict)
        .find(|caps| &caps[1] == key.as_bytes())
        .and_then(|caps| {
            let number = caps.get(2)?;
            let value = std::str::from_utf8(number.as_bytes()).ok()?.parse().ok()?;
            Some((value, number.range()))
        })
}

fn integer_span(data: &[u8]) -> Option<Range<usize>> {
    let start = skip_whitespace(data);
    let digits = count_digits(&data[start..]);
    (digits > 0).then(|| start..start + digits)
}

/// Everything after the first newline
pub(crate) fn skip_line(buf: &[u8]) -> &[u8] {
    match buf.iter().position(|&b| b == b'\n') {
        Some(i) => &buf[i + 1..],
        None => &[],
    }
}

pub(crate) fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn skip_whitespace(buf: &[u8]) -> usize {
    buf.iter().take_while(|b| b.is_ascii_whitespace()).count()
}

fn count_digits(buf: &[u8]) -> usize {
    buf.iter().take_while(|b| b.is_ascii_digit()).count()
}
