//! Cross-reference table
//!
//! The classic `xref` section stores only offsets. Object lengths are derived
//! by sorting the offsets and subtracting neighbours; the last object runs up
//! to the start of the `xref` section itself.

use std::io::{Read, Seek, Write};

use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::error::{Error, Result};
use super::object::scan_value;
use super::store::{ByteSink, ByteStore};

/// How far back from end-of-file to look for `startxref`
const TRAILER_SEARCH_WINDOW: u64 = 1024;

/// Shortest xref row: 10-digit offset, 5-digit generation, flag, one EOL byte
const MIN_XREF_ROW_LEN: usize = 19;

lazy_static! {
    static ref RE_STARTXREF: Regex = Regex::new(r"startxref\s+(\d+)").unwrap();
}

/// Location of one object inside a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XrefEntry {
    pub offset: u64,
    pub length: u64,
    pub object_number: u32,
}

/// Object number → byte range index for one container
#[derive(Debug, Clone, Default)]
pub struct CrossReferenceTable {
    entries: Vec<XrefEntry>,
}

impl CrossReferenceTable {
    /// Empty table for a document being written
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the xref section and trailer dictionary of a source container
    ///
    /// Returns the table and the raw trailer dictionary text.
    pub fn read<R: Read + Seek>(store: &mut ByteStore<R>) -> Result<(Self, Vec<u8>)> {
        let tail = store.read_tail(TRAILER_SEARCH_WINDOW)?;
        let xref_offset = RE_STARTXREF
            .captures_iter(&tail)
            .last()
            .and_then(|caps| std::str::from_utf8(&caps[1]).ok()?.parse::<u64>().ok())
            .ok_or_else(|| Error::Format("missing 'startxref' pointer".to_string()))?;

        let section = store.read_from(xref_offset)?;
        let mut rest: &[u8] = &section;

        if next_line(&mut rest).map(|l| l.trim_ascii()) != Some(b"xref".as_slice()) {
            return Err(Error::Format(format!("expected 'xref' at offset {}", xref_offset)));
        }

        let header = next_line(&mut rest)
            .ok_or_else(|| Error::Format("missing xref subsection header".to_string()))?;
        let mut fields = header.split(|b| b.is_ascii_whitespace()).filter(|f| !f.is_empty());
        let first = fields.next().and_then(parse_u64);
        let count = fields.next().and_then(parse_u64);
        let (first, count) = match (first, count) {
            (Some(first), Some(count)) => (first, count),
            _ => {
                return Err(Error::Format(format!(
                    "invalid xref subsection header: {:?}",
                    String::from_utf8_lossy(header)
                )))
            }
        };

        // the header's numbers come straight from the file
        let first_number = u32::try_from(first)
            .ok()
            .filter(|&f| u32::try_from(count).ok().and_then(|c| f.checked_add(c)).is_some())
            .ok_or_else(|| {
                Error::Format(format!("xref subsection {} {} exceeds the object number range", first, count))
            })?;
        if count > (rest.len() / MIN_XREF_ROW_LEN) as u64 {
            return Err(Error::Format(format!(
                "xref subsection lists {} entries but holds at most {}",
                count,
                rest.len() / MIN_XREF_ROW_LEN
            )));
        }

        let mut offsets = Vec::with_capacity(count as usize);
        for i in 0..count {
            let row = next_line(&mut rest)
                .ok_or_else(|| Error::Format(format!("xref table ends before entry {}", i)))?;
            let offset = row
                .split(|b| b.is_ascii_whitespace())
                .find(|f| !f.is_empty())
                .and_then(parse_u64)
                .ok_or_else(|| {
                    Error::Format(format!("invalid xref entry: {:?}", String::from_utf8_lossy(row)))
                })?;
            offsets.push(offset);
        }

        let rest = rest.trim_ascii_start();
        let rest = rest
            .strip_prefix(b"trailer")
            .ok_or_else(|| Error::Format("expected 'trailer' after xref entries".to_string()))?
            .trim_ascii_start();
        let len = scan_value(rest)
            .filter(|_| rest.starts_with(b"<<"))
            .ok_or_else(|| Error::Format("trailer is not a dictionary".to_string()))?;
        let trailer = rest[..len].to_vec();

        let table = Self::from_offsets(first_number, &offsets, xref_offset);
        log::debug!("Read {} xref entries, xref section at {}", table.len(), xref_offset);
        Ok((table, trailer))
    }

    /// Build a table from offsets listed in object-number order
    ///
    /// `region_end` is the offset where the object region stops (the start of
    /// the xref section).
    pub fn from_offsets(first_number: u32, offsets: &[u64], region_end: u64) -> Self {
        let mut by_offset: Vec<(u64, u32)> = offsets
            .iter()
            .enumerate()
            .map(|(i, &offset)| (offset, first_number + i as u32))
            .collect();
        by_offset.sort_by_key(|&(offset, _)| offset);

        let mut entries: Vec<XrefEntry> = by_offset
            .iter()
            .enumerate()
            .map(|(i, &(offset, object_number))| {
                let next = by_offset.get(i + 1).map_or(region_end, |&(o, _)| o);
                XrefEntry {
                    offset,
                    length: next.saturating_sub(offset),
                    object_number,
                }
            })
            .collect();
        entries.sort_by_key(|e| e.object_number);

        Self { entries }
    }

    /// Record an object that has just been written
    pub fn register(&mut self, offset: u64, length: u64, object_number: u32) {
        self.entries.push(XrefEntry { offset, length, object_number });
    }

    /// Number of registered entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[XrefEntry] {
        &self.entries
    }

    /// Look up the entry for an object number
    pub fn entry(&self, object_number: u32) -> Option<&XrefEntry> {
        match self.entries.get(object_number as usize) {
            Some(entry) if entry.object_number == object_number => Some(entry),
            _ => self.entries.iter().find(|e| e.object_number == object_number),
        }
    }

    /// Emit the xref section and trailer
    ///
    /// Entries are written in object-number order. Object 0 is the free list
    /// head (generation 65535); the root and info objects are taken to be
    /// the last and second-to-last object numbers.
    pub fn write<W: Write>(&self, sink: &mut ByteSink<W>) -> Result<()> {
        let start = sink.position();
        let size = self.entries.len();

        let mut sorted = self.entries.clone();
        sorted.sort_by_key(|e| e.object_number);

        let mut buf = format!("xref\n0 {}\n", size);
        for entry in &sorted {
            if entry.object_number == 0 {
                buf.push_str(&format!("{:010} 65535 f \n", entry.offset));
            } else {
                buf.push_str(&format!("{:010} 00000 n \n", entry.offset));
            }
        }

        buf.push_str(&format!(
            "trailer\n<< /Size {}\n   /Root {} 0 R\n   /Info {} 0 R\n>>\n",
            size,
            size.saturating_sub(1),
            size.saturating_sub(2)
        ));
        buf.push_str(&format!("startxref\n{}\n%%EOF\n", start));

        sink.append(buf.as_bytes())?;
        Ok(())
    }
}

/// Pop one `\n`-terminated line (without the terminator)
fn next_line<'a>(rest: &mut &'a [u8]) -> Option<&'a [u8]> {
    let buf: &'a [u8] = *rest;
    if buf.is_empty() {
        return None;
    }
    let (line, tail) = match buf.iter().position(|&b| b == b'\n') {
        Some(i) => (&buf[..i], &buf[i + 1..]),
        None => (buf, &buf[buf.len()..]),
    };
    *rest = tail;
    Some(line.strip_suffix(b"\r").unwrap_or(line))
}

fn parse_u64(field: &[u8]) -> Option<u64> {
    std::str::from_utf8(field).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file() -> Vec<u8> {
        let mut buf = b"%PDF-1.3\n".to_vec();
        let o1 = buf.len();
        buf.extend_from_slice(b"1 0 obj\n<< /Type /Pages /Kids [ 3 0 R ] /Count 1 >>\nendobj\n");
        let o2 = buf.len();
        buf.extend_from_slice(b"2 0 obj\n<< /Type /Catalog /Pages 1 0 R >>\nendobj\n");
        let o3 = buf.len();
        buf.extend_from_slice(b"3 0 obj\n<< /Type /Page /Parent 1 0 R >>\nendobj\n");
        let xref = buf.len();
        buf.extend_from_slice(b"xref\n0 4\n0000000000 65535 f \n");
        for o in [o1, o2, o3] {
            buf.extend_from_slice(format!("{:010} 00000 n \n", o).as_bytes());
        }
        buf.extend_from_slice(b"trailer\n<< /Size 4 /Root 2 0 R >>\n");
        buf.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref).as_bytes());
        buf
    }

    #[test]
    fn test_from_offsets_derives_lengths() {
        // listed out of offset order on purpose
        let table = CrossReferenceTable::from_offsets(0, &[0, 300, 100, 150], 420);
        let lengths: Vec<(u32, u64, u64)> = table
            .entries()
            .iter()
            .map(|e| (e.object_number, e.offset, e.length))
            .collect();
        assert_eq!(lengths, vec![(0, 0, 100), (1, 300, 120), (2, 100, 50), (3, 150, 150)]);
    }

    #[test]
    fn test_read_table_and_trailer() {
        let bytes = sample_file();
        let mut store = ByteStore::from_bytes(bytes.clone());
        let (table, trailer) = CrossReferenceTable::read(&mut store).unwrap();

        assert_eq!(table.len(), 4);
        assert_eq!(trailer, b"<< /Size 4 /Root 2 0 R >>\n");

        let header = table.entry(0).unwrap();
        assert_eq!((header.offset, header.length), (0, 9));

        let xref_start = bytes.windows(5).position(|w| w == b"xref\n").unwrap() as u64;
        let last = table.entry(3).unwrap();
        assert_eq!(last.offset + last.length, xref_start);

        let first = table.entry(1).unwrap();
        let raw = &bytes[first.offset as usize..(first.offset + first.length) as usize];
        assert!(raw.starts_with(b"1 0 obj\n"));
        assert!(raw.ends_with(b"endobj\n"));
    }

    #[test]
    fn test_read_missing_startxref() {
        let mut store = ByteStore::from_bytes(b"%PDF-1.3\nno trailer here\n".to_vec());
        let result = CrossReferenceTable::read(&mut store);
        assert!(matches!(result, Err(Error::Format(_))));
    }

    #[test]
    fn test_read_bad_xref_keyword() {
        let mut store = ByteStore::from_bytes(b"%PDF-1.3\nxreg\n0 0\nstartxref\n9\n%%EOF\n".to_vec());
        let result = CrossReferenceTable::read(&mut store);
        assert!(matches!(result, Err(Error::Format(msg)) if msg.contains("'xref'")));
    }

    #[test]
    fn test_read_rejects_oversized_entry_count() {
        let mut store = ByteStore::from_bytes(
            b"%PDF-1.3\nxref\n0 99999999999999999\n0000000000 65535 f \ntrailer\n<< /Size 1 >>\nstartxref\n9\n%%EOF\n"
                .to_vec(),
        );
        let result = CrossReferenceTable::read(&mut store);
        assert!(matches!(result, Err(Error::Format(_))));
    }

    #[test]
    fn test_read_rejects_count_beyond_rows() {
        let mut store = ByteStore::from_bytes(
            b"%PDF-1.3\nxref\n0 40\n0000000000 65535 f \ntrailer\n<< /Size 1 >>\nstartxref\n9\n%%EOF\n".to_vec(),
        );
        let result = CrossReferenceTable::read(&mut store);
        assert!(matches!(result, Err(Error::Format(msg)) if msg.contains("at most")));
    }

    #[test]
    fn test_read_rejects_object_number_overflow() {
        for header in ["4294967295 2", "4294967296 1"] {
            let file = format!(
                "%PDF-1.3\nxref\n{}\n0000000009 00000 n \n0000000009 00000 n \ntrailer\n<< /Size 2 >>\nstartxref\n9\n%%EOF\n",
                header
            );
            let mut store = ByteStore::from_bytes(file.into_bytes());
            let result = CrossReferenceTable::read(&mut store);
            assert!(
                matches!(result, Err(Error::Format(ref msg)) if msg.contains("object number range")),
                "header {:?} gave {:?}",
                header,
                result.as_ref().map(|(t, _)| t.len())
            );
        }
    }

    #[test]
    fn test_write_sorts_by_object_number() {
        let mut table = CrossReferenceTable::new();
        table.register(0, 15, 0);
        table.register(15, 40, 2);
        table.register(55, 30, 3);
        table.register(85, 20, 1);

        let mut sink = ByteSink::new(Vec::new());
        sink.append(&[b' '; 105]).unwrap();
        table.write(&mut sink).unwrap();
        let out = String::from_utf8(sink.finish().unwrap()[105..].to_vec()).unwrap();

        assert_eq!(
            out,
            "xref\n0 4\n\
             0000000000 65535 f \n\
             0000000085 00000 n \n\
             0000000015 00000 n \n\
             0000000055 00000 n \n\
             trailer\n<< /Size 4\n   /Root 3 0 R\n   /Info 2 0 R\n>>\n\
             startxref\n105\n%%EOF\n"
        );
    }
}
