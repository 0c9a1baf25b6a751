//! Page selection module
//!
//! Parses page selectors such as `0,5...2,8..-1` and resolves them against a
//! document's page count. Indices are zero-based; negative indices count from
//! the end of the document.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// One comma-separated piece of a page selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    /// First page index (may be negative)
    pub first: i64,
    /// Last page index (may be negative)
    pub last: i64,
    /// Whether `last` itself is excluded (`a...b`)
    pub exclusive: bool,
}

impl PageRange {
    /// A range covering exactly one page
    pub fn single(index: i64) -> Self {
        Self { first: index, last: index, exclusive: false }
    }

    /// Resolve to absolute page indices for a document with `count` pages
    ///
    /// Both endpoints are reduced modulo `count` first, so `-1` is the last
    /// page. The range walks downwards when `first > last`, and an exclusive
    /// range drops its final step.
    pub fn resolve(&self, count: usize) -> Result<Vec<usize>> {
        if count == 0 {
            return Err(Error::PageOutOfRange { index: self.first, count });
        }

        let n = count as i64;
        let first = self.first.rem_euclid(n);
        let mut last = self.last.rem_euclid(n);
        let step = if first <= last { 1 } else { -1 };
        if self.exclusive {
            last -= step;
        }

        let mut pages = Vec::new();
        let mut i = first;
        while (step > 0 && i <= last) || (step < 0 && i >= last) {
            pages.push(i as usize);
            i += step;
        }
        Ok(pages)
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first == self.last && !self.exclusive {
            write!(f, "{}", self.first)
        } else if self.exclusive {
            write!(f, "{}...{}", self.first, self.last)
        } else {
            write!(f, "{}..{}", self.first, self.last)
        }
    }
}

/// An ordered list of page ranges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    ranges: Vec<PageRange>,
}

impl PageSelection {
    /// Every page, in document order (`0..-1`)
    pub fn all() -> Self {
        Self {
            ranges: vec![PageRange { first: 0, last: -1, exclusive: false }],
        }
    }

    /// Parse a selector string
    ///
    /// Supported forms, separated by commas (whitespace is ignored):
    /// - `3` → a single page
    /// - `2-5` or `2..5` → inclusive range
    /// - `5...2` → exclusive range (`[5, 4, 3]`)
    /// - `-1` → the last page
    pub fn parse(spec: &str) -> Result<Self> {
        let compact: String = spec.chars().filter(|c| !c.is_whitespace()).collect();
        let ranges = compact
            .split(',')
            .map(parse_range)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { ranges })
    }

    #[cfg(test)]
    fn ranges(&self) -> &[PageRange] {
        &self.ranges
    }

    /// Resolve every range and concatenate the resulting page indices
    pub fn resolve(&self, count: usize) -> Result<Vec<usize>> {
        let mut pages = Vec::new();
        for range in &self.ranges {
            pages.extend(range.resolve(count)?);
        }
        Ok(pages)
    }
}

impl Default for PageSelection {
    fn default() -> Self {
        Self::all()
    }
}

impl FromStr for PageSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", range)?;
        }
        Ok(())
    }
}

/// Split an input argument such as `input.pdf[0,5...2]` into the file name
/// and its page selection
///
/// An argument without a trailing `[...]` group selects every page.
pub fn split_input_argument(arg: &str) -> Result<(String, PageSelection)> {
    if let Some(stripped) = arg.strip_suffix(']') {
        if let Some(open) = stripped.rfind('[') {
            let spec = &stripped[open + 1..];
            if !spec.contains(['[', ']']) {
                return Ok((stripped[..open].to_string(), PageSelection::parse(spec)?));
            }
        }
    }
    Ok((arg.to_string(), PageSelection::all()))
}

/// Parse a single range like `4`, `1-3`, `0..-1` or `5...2`
fn parse_range(text: &str) -> Result<PageRange> {
    let invalid = || Error::InvalidPageSpecification(text.to_string());

    let (first, rest) = split_number(text).ok_or_else(invalid)?;
    if rest.is_empty() {
        return Ok(PageRange::single(first));
    }

    let (exclusive, rest) = if let Some(r) = rest.strip_prefix("...") {
        (true, r)
    } else if let Some(r) = rest.strip_prefix("..") {
        (false, r)
    } else if let Some(r) = rest.strip_prefix('-') {
        (false, r)
    } else {
        return Err(invalid());
    };

    let (last, tail) = split_number(rest).ok_or_else(invalid)?;
    if !tail.is_empty() {
        return Err(invalid());
    }

    Ok(PageRange { first, last, exclusive })
}

/// Split a leading optionally-negative integer off `s`
fn split_number(s: &str) -> Option<(i64, &str)> {
    let start = usize::from(s.starts_with('-'));
    let end = s[start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(s.len(), |i| i + start);
    if end == start {
        return None;
    }
    s[..end].parse().ok().map(|n| (n, &s[end..]))
}
