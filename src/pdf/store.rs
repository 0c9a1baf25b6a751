//! Positioned reads from a source container and position-tracking appends to
//! an output container

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Error, Result};

/// Read-only, random-access view of a container file
pub struct ByteStore<R> {
    inner: R,
    len: u64,
}

impl ByteStore<BufReader<File>> {
    /// Open a file for positioned reads
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl ByteStore<Cursor<Vec<u8>>> {
    /// Wrap an in-memory buffer
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let len = bytes.len() as u64;
        Self { inner: Cursor::new(bytes), len }
    }
}

impl<R: Read + Seek> ByteStore<R> {
    /// Wrap any seekable reader
    pub fn new(mut inner: R) -> Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        Ok(Self { inner, len })
    }

    /// Total size in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read exactly `len` bytes starting at `offset`
    pub fn read_at(&mut self, offset: u64, len: u64) -> Result<Vec<u8>> {
        if offset.saturating_add(len) > self.len {
            return Err(Error::Format(format!(
                "byte range {}+{} runs past end of file ({} bytes)",
                offset, len, self.len
            )));
        }
        self.inner.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0; len as usize];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read from `offset` to the end of the file
    pub fn read_from(&mut self, offset: u64) -> Result<Vec<u8>> {
        let offset = offset.min(self.len);
        self.read_at(offset, self.len - offset)
    }

    /// Read the last `len` bytes (or the whole file if it is shorter)
    pub fn read_tail(&mut self, len: u64) -> Result<Vec<u8>> {
        self.read_from(self.len.saturating_sub(len))
    }
}

/// Append-only output container that tracks its write position
pub struct ByteSink<W: Write> {
    inner: W,
    position: u64,
}

impl ByteSink<BufWriter<File>> {
    /// Create (or truncate) a file for writing
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> ByteSink<W> {
    /// Wrap any writer; the first byte written is at position 0
    pub fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }

    /// Offset at which the next append lands
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Append `bytes`, returning the offset they were written at
    pub fn append(&mut self, bytes: &[u8]) -> Result<u64> {
        let start = self.position;
        self.inner.write_all(bytes)?;
        self.position += bytes.len() as u64;
        Ok(start)
    }

    /// Flush and hand back the underlying writer
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}
