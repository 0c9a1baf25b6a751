//! Stream objects and their FlateDecode payloads

use std::fmt;
use std::io::{Read, Seek, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{Error, Result};
use super::document::{OutputDocument, SourceDocument};
use super::object::{find_bytes, skip_line, IndirectObject, ReadObject};

/// DEFLATE effort used when a stream payload is replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    /// zlib's own default
    #[default]
    Default,
    /// Explicit level, 0 (store only) to 9 (best)
    Level(u32),
}

impl CompressionLevel {
    /// Map a user-supplied number; anything outside 0–9 means the default
    pub fn from_level(level: i64) -> Self {
        if (0..=9).contains(&level) {
            CompressionLevel::Level(level as u32)
        } else {
            CompressionLevel::Default
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, CompressionLevel::Default)
    }

    pub fn to_flate(self) -> Compression {
        match self {
            CompressionLevel::Default => Compression::default(),
            CompressionLevel::Level(n) => Compression::new(n),
        }
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionLevel::Default => f.write_str("DEFAULT_COMPRESSION"),
            CompressionLevel::Level(0) => f.write_str("NO_COMPRESSION"),
            CompressionLevel::Level(1) => f.write_str("BEST_SPEED"),
            CompressionLevel::Level(9) => f.write_str("BEST_COMPRESSION"),
            CompressionLevel::Level(n) => write!(f, "{}", n),
        }
    }
}

/// How the bytes between `stream` and `endstream` are encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFilter {
    /// `/FlateDecode`: inflated on read, deflated on write
    Flate,
    /// No `/Filter`: the stored bytes are the content
    Unfiltered,
    /// Any other filter: copied through untouched
    Opaque,
}

impl StreamFilter {
    fn detect(dict: &[u8]) -> Self {
        if find_bytes(dict, b"/FlateDecode").is_some() {
            StreamFilter::Flate
        } else if find_bytes(dict, b"/Filter").is_some() {
            StreamFilter::Opaque
        } else {
            StreamFilter::Unfiltered
        }
    }
}

/// An object with a stream payload and an indirect `/Length` object
///
/// The length object travels with the stream: it is renumbered alongside it,
/// rewritten from the final payload size and written right after it.
#[derive(Debug, Clone)]
pub struct StreamObject {
    object: IndirectObject,
    length: IndirectObject,
    payload: Option<Vec<u8>>,
    filter: StreamFilter,
    level: CompressionLevel,
}

impl StreamObject {
    /// Assemble a stream from its parsed dictionary, its length object and
    /// the bytes that followed the dictionary
    pub fn from_parts(object: IndirectObject, length: IndirectObject, rest: &[u8]) -> Result<Self> {
        let number = object.number();
        let filter = StreamFilter::detect(object.data());

        let payload = if rest.starts_with(b"stream") {
            let declared = length.integer_value().ok_or_else(|| {
                Error::Format(format!(
                    "length object {} of object {} is not an integer",
                    length.number(),
                    number
                ))
            })?;
            let body = skip_line(rest);
            if (body.len() as u64) < declared {
                return Err(Error::Format(format!(
                    "stream of object {} is shorter than its /Length {}",
                    number, declared
                )));
            }
            Some(body[..declared as usize].to_vec())
        } else {
            None
        };

        Ok(Self {
            object,
            length,
            payload,
            filter,
            level: CompressionLevel::Default,
        })
    }

    pub fn number(&self) -> u32 {
        self.object.number()
    }

    pub fn object(&self) -> &IndirectObject {
        &self.object
    }

    pub fn length_object(&self) -> &IndirectObject {
        &self.length
    }

    pub fn filter(&self) -> StreamFilter {
        self.filter
    }

    /// Stored (possibly compressed) payload bytes
    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    pub fn compression_level(&self) -> CompressionLevel {
        self.level
    }

    /// Renumber the stream and its length object
    pub fn move_to(&mut self, number: u32, length_number: u32) {
        self.object.move_to(number);
        self.length.move_to(length_number);
    }

    /// Set the level used by later [`set_payload`](Self::set_payload) calls
    ///
    /// Ignored for objects without stream data.
    pub fn set_compression_level(&mut self, level: CompressionLevel) {
        if self.payload.is_some() {
            self.level = level;
        }
    }

    /// The decoded content bytes
    pub fn decompressed_payload(&self) -> Result<Vec<u8>> {
        let number = self.number();
        let payload = self
            .payload
            .as_ref()
            .ok_or_else(|| Error::Format(format!("object {} has no stream data", number)))?;

        match self.filter {
            StreamFilter::Flate => {
                let mut out = Vec::new();
                ZlibDecoder::new(payload.as_slice())
                    .read_to_end(&mut out)
                    .map_err(|source| Error::CorruptStream { object: number, source })?;
                Ok(out)
            }
            StreamFilter::Unfiltered => Ok(payload.clone()),
            StreamFilter::Opaque => Err(Error::Format(format!(
                "object {} uses a filter other than FlateDecode",
                number
            ))),
        }
    }

    /// Replace the content with `raw`, deflated at the configured level
    ///
    /// An unfiltered stream gains `/Filter /FlateDecode`. The length object
    /// is brought up to date when the stream is written.
    pub fn set_payload(&mut self, raw: &[u8]) -> Result<()> {
        match self.filter {
            StreamFilter::Opaque => {
                return Err(Error::Format(format!(
                    "object {} uses a filter other than FlateDecode",
                    self.number()
                )))
            }
            StreamFilter::Unfiltered => {
                let mut data = self.object.data().to_vec();
                data.splice(2..2, b" /Filter /FlateDecode".iter().copied());
                self.object.set_data(data);
                self.filter = StreamFilter::Flate;
            }
            StreamFilter::Flate => {}
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), self.level.to_flate());
        encoder.write_all(raw)?;
        self.payload = Some(encoder.finish()?);
        Ok(())
    }

    /// Decode and re-encode the payload at the configured level
    pub fn recompress(&mut self) -> Result<()> {
        let raw = self.decompressed_payload()?;
        self.set_payload(&raw)
    }

    /// Point `/Length` at the length object and store the payload size in it
    pub fn refresh_length(&mut self) {
        self.object.replace_reference("/Length", self.length.number());
        if let Some(payload) = &self.payload {
            self.length.set_integer_value(payload.len() as u64);
        }
    }

    /// Serialize the stream object (not its length object)
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        let mut buf = format!("{} 0 obj\n", self.number()).into_bytes();
        buf.extend_from_slice(self.object.data());
        if let Some(payload) = &self.payload {
            buf.extend_from_slice(b"stream\n");
            buf.extend_from_slice(payload);
            buf.extend_from_slice(b"\nendstream\n");
        }
        buf.extend_from_slice(b"endobj\n");
        buf
    }

    /// Write the stream, then its length object
    pub fn write<W: Write>(&mut self, target: &mut OutputDocument<W>) -> Result<()> {
        self.refresh_length();
        target.append_object(self.number(), &self.to_canonical_bytes())?;
        self.length.write(target)
    }
}

impl ReadObject for StreamObject {
    fn read<R: Read + Seek>(source: &mut SourceDocument<R>, number: u32) -> Result<Self> {
        let raw = source.read_raw(number)?;
        let (object, rest) = IndirectObject::parse(number, &raw)?;

        let length_number = object.reference("/Length").ok_or_else(|| Error::MissingReference {
            object: number,
            key: "/Length".to_string(),
        })?;
        let length: IndirectObject = source.get(length_number)?;

        Self::from_parts(object, length, rest)
    }
}
