//! Cross-reference table parser.
//!
//! The xref maps object numbers to byte offsets (or to a slot inside an object
//! stream), enabling random access to objects. Both classic tables
//! (PDF 1.0-1.4) and cross-reference streams (PDF 1.5+) are read, including
//! incremental-update chains through `/Prev` and hybrid files with `/XRefStm`.

use crate::decoders::decode_stream_with_options;
use crate::error::{Error, Result};
use crate::lexer::{Token, token};
use crate::object::{Dictionary, PdfValue};
use crate::parser::ObjectParser;
use crate::parser_config::ParserOptions;
use std::collections::{BTreeMap, HashSet};

/// Number of trailing bytes searched for `startxref`.
const STARTXREF_WINDOW: usize = 2048;

/// Upper bound on entries in one classic subsection.
const MAX_SUBSECTION: i64 = 10_000_000;

/// Where to find an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    /// Free object (`f` entry or type 0)
    Free {
        /// Next free object number
        next: u32,
        /// Generation to use if the number is reused
        gen: u16,
    },
    /// Object stored directly in the file (`n` entry or type 1)
    InUse {
        /// Byte offset of `N G obj`
        offset: usize,
        /// Generation number
        gen: u16,
    },
    /// Object stored inside an object stream (type 2)
    Compressed {
        /// Object number of the containing `/Type /ObjStm` stream
        stream: u32,
        /// Index within the stream
        index: u32,
    },
}

impl XRefEntry {
    /// Entry for an object at a byte offset.
    pub fn uncompressed(offset: usize, gen: u16) -> Self {
        XRefEntry::InUse { offset, gen }
    }

    /// Entry for an object in an object stream.
    pub fn compressed(stream: u32, index: u32) -> Self {
        XRefEntry::Compressed { stream, index }
    }

    /// Free entry.
    pub fn free(next: u32, gen: u16) -> Self {
        XRefEntry::Free { next, gen }
    }

    /// Whether the entry describes a live object.
    pub fn in_use(&self) -> bool {
        !matches!(self, XRefEntry::Free { .. })
    }
}

/// Cross-reference table together with the trailer it came with.
#[derive(Debug, Clone, Default)]
pub struct CrossRefTable {
    entries: BTreeMap<u32, XRefEntry>,
    trailer: Dictionary,
}

impl CrossRefTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trailer dictionary (for xref streams, the stream dictionary).
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    /// Replace the trailer dictionary.
    pub fn set_trailer(&mut self, trailer: Dictionary) {
        self.trailer = trailer;
    }

    /// Add or replace an entry.
    pub fn add_entry(&mut self, object_number: u32, entry: XRefEntry) {
        self.entries.insert(object_number, entry);
    }

    /// Look up an entry.
    pub fn get(&self, object_number: u32) -> Option<&XRefEntry> {
        self.entries.get(&object_number)
    }

    /// Whether the object number has a live entry.
    pub fn contains(&self, object_number: u32) -> bool {
        self.get(object_number).is_some_and(|e| e.in_use())
    }

    /// All entries in object number order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &XRefEntry)> + '_ {
        self.entries.iter().map(|(n, e)| (*n, e))
    }

    /// Highest object number present.
    pub fn max_object_number(&self) -> u32 {
        self.entries.keys().next_back().copied().unwrap_or(0)
    }

    /// Fill in entries and trailer keys from an older section.
    ///
    /// Entries already present win, matching incremental-update semantics.
    pub fn merge_older(&mut self, older: CrossRefTable) {
        for (n, entry) in older.entries {
            self.entries.entry(n).or_insert(entry);
        }
        for (key, value) in older.trailer {
            if key != "Prev" && key != "XRefStm" {
                self.trailer.entry(key).or_insert(value);
            }
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Find the offset named by the last `startxref` in the final 2048 bytes.
pub fn find_startxref(data: &[u8]) -> Result<usize> {
    let window_start = data.len().saturating_sub(STARTXREF_WINDOW);
    let window = &data[window_start..];
    let keyword = b"startxref";
    let pos = window
        .windows(keyword.len())
        .rposition(|w| w == keyword)
        .ok_or_else(|| Error::malformed("startxref not found"))?;

    match token(&window[pos + keyword.len()..]) {
        Ok((_, Token::Integer(n))) if n >= 0 && (n as usize) < data.len() => Ok(n as usize),
        _ => Err(Error::malformed("startxref offset is invalid")),
    }
}

/// Read the whole cross-reference chain starting at `offset`.
///
/// Newer sections win over the sections they point to with `/Prev`; a hybrid
/// section's `/XRefStm` ranks between the section itself and its `/Prev`.
pub fn read_xref_chain(data: &[u8], offset: usize, options: &ParserOptions) -> Result<CrossRefTable> {
    let mut visited = HashSet::new();
    let mut table = CrossRefTable::new();
    let mut next = Some(offset);
    let mut depth = 0usize;

    while let Some(current) = next.take() {
        if !visited.insert(current) {
            log::warn!("Cross-reference /Prev chain loops back to offset {}", current);
            break;
        }
        if depth >= options.max_xref_chain {
            return Err(Error::malformed(format!(
                "cross-reference chain longer than {} sections",
                options.max_xref_chain
            )));
        }
        depth += 1;

        let mut section = read_section(data, current, options)?;
        let prev = offset_entry(section.trailer(), "Prev");

        if let Some(stm_offset) = offset_entry(section.trailer(), "XRefStm") {
            if visited.insert(stm_offset) {
                match read_xref_stream(data, stm_offset, options) {
                    Ok(stream_section) => section.merge_older(stream_section),
                    Err(e) => log::warn!("Ignoring unreadable /XRefStm at {}: {}", stm_offset, e),
                }
            }
        }

        table.merge_older(section);
        next = prev;
    }

    log::debug!("Cross-reference chain: {} sections, {} entries", depth, table.len());
    Ok(table)
}

fn offset_entry(trailer: &Dictionary, key: &str) -> Option<usize> {
    trailer
        .get(key)
        .and_then(|v| v.as_integer())
        .filter(|n| *n >= 0)
        .map(|n| n as usize)
}

/// Read one section, detecting classic table versus xref stream.
pub fn read_section(data: &[u8], offset: usize, options: &ParserOptions) -> Result<CrossRefTable> {
    let input = data
        .get(offset..)
        .ok_or_else(|| Error::malformed(format!("xref offset {} past end of file", offset)))?;

    match token(input) {
        Ok((after, Token::Keyword(b"xref"))) => {
            log::debug!("Classic xref table at offset {}", offset);
            read_classic_table(data, after, options)
        },
        Ok((_, Token::Integer(_))) => {
            log::debug!("Cross-reference stream at offset {}", offset);
            read_xref_stream(data, offset, options)
        },
        _ => Err(Error::malformed(format!("no cross-reference data at offset {}", offset))),
    }
}

/// Parse a classic table body following the `xref` keyword.
///
/// ```text
/// xref
/// 0 3
/// 0000000000 65535 f
/// 0000000018 00000 n
/// 0000000077 00000 n
/// trailer
/// << /Size 3 /Root 1 0 R >>
/// ```
fn read_classic_table(data: &[u8], body: &[u8], options: &ParserOptions) -> Result<CrossRefTable> {
    let mut table = CrossRefTable::new();
    let mut rest = body;

    loop {
        match token(rest) {
            Ok((after, Token::Keyword(b"trailer"))) => {
                let parser = ObjectParser::new(options);
                let (_, trailer) = parser
                    .parse(after)
                    .map_err(|e| crate::parser::to_parse_error(after, data.len() - after.len(), e))?;
                match trailer {
                    PdfValue::Dictionary(d) => table.set_trailer(d),
                    other => return Err(Error::malformed(format!("trailer is a {}", other.type_name()))),
                }
                return Ok(table);
            },
            Ok((after, Token::Integer(start))) => {
                let (after, count) = match token(after) {
                    Ok((a, Token::Integer(c))) if (0..=MAX_SUBSECTION).contains(&c) => (a, c),
                    _ => return Err(Error::malformed("bad xref subsection header")),
                };
                if start < 0 || start > u32::MAX as i64 {
                    return Err(Error::malformed("bad xref subsection start"));
                }
                rest = read_subsection(after, start as u32, count as u32, &mut table);
            },
            _ => return Err(Error::malformed("xref table is missing its trailer")),
        }
    }
}

/// Read up to `count` `offset gen n|f` triples; stops early on anything else.
fn read_subsection<'a>(mut input: &'a [u8], start: u32, count: u32, table: &mut CrossRefTable) -> &'a [u8] {
    for i in 0..count {
        let triple = token(input).ok().and_then(|(a, t1)| {
            let (b, t2) = token(a).ok()?;
            let (c, t3) = token(b).ok()?;
            Some((c, t1, t2, t3))
        });
        let Some((after, Token::Integer(field1), Token::Integer(gen), Token::Keyword(kind))) = triple
        else {
            log::warn!("xref subsection at {} declares {} entries, found {}", start, count, i);
            return input;
        };
        let number = start.saturating_add(i);
        let gen = gen.clamp(0, u16::MAX as i64) as u16;
        let entry = match kind {
            b"n" if field1 > 0 => XRefEntry::uncompressed(field1 as usize, gen),
            b"n" => XRefEntry::free(0, gen),
            b"f" => XRefEntry::free(field1.max(0) as u32, gen),
            other => {
                log::warn!(
                    "Invalid xref entry type {:?} for object {}, treating as free",
                    String::from_utf8_lossy(other),
                    number
                );
                XRefEntry::free(0, gen)
            },
        };
        table.add_entry(number, entry);
        input = after;
    }
    input
}

/// Parse a cross-reference stream (`/Type /XRef`).
///
/// Each row has three big-endian fields sized by `/W`; a zero-width type field
/// defaults to 1. `/Index` lists `start count` ranges, defaulting to `[0 Size]`.
pub fn read_xref_stream(data: &[u8], offset: usize, options: &ParserOptions) -> Result<CrossRefTable> {
    let input = data
        .get(offset..)
        .ok_or_else(|| Error::malformed(format!("xref stream offset {} past end of file", offset)))?;
    let parser = ObjectParser::new(options);
    let (_, (_, value)) = parser
        .indirect_object(input)
        .map_err(|e| crate::parser::to_parse_error(input, offset, e))?;

    let dict = match &value {
        PdfValue::Stream { dict, .. } => dict,
        other => return Err(other.type_error("Stream")),
    };
    if dict.get("Type").and_then(|t| t.as_name()) != Some("XRef") {
        return Err(Error::malformed("cross-reference stream lacks /Type /XRef"));
    }

    let widths: Vec<usize> = dict
        .get("W")
        .and_then(|w| w.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_integer())
                .map(|n| n.max(0) as usize)
                .collect()
        })
        .unwrap_or_default();
    if widths.len() != 3 || widths.iter().any(|&w| w > 8) {
        return Err(Error::malformed("cross-reference stream has an invalid /W"));
    }
    let size = dict.get("Size").and_then(|v| v.as_integer()).unwrap_or(0).max(0);

    let ranges: Vec<(u32, u32)> = match dict.get("Index").and_then(|v| v.as_array()) {
        Some(index) => index
            .chunks(2)
            .filter_map(|pair| match pair {
                [s, c] => Some((s.as_integer()?.max(0) as u32, c.as_integer()?.max(0) as u32)),
                _ => None,
            })
            .collect(),
        None => vec![(0, size as u32)],
    };

    let decoded = decode_stream_with_options(&value, options)?;
    let row = widths.iter().sum::<usize>();
    if row == 0 {
        return Err(Error::malformed("cross-reference stream rows are empty"));
    }

    let mut table = CrossRefTable::new();
    let mut rows = decoded.chunks_exact(row);
    'ranges: for (start, count) in ranges {
        for i in 0..count {
            let Some(bytes) = rows.next() else {
                log::warn!("Cross-reference stream data ends early");
                break 'ranges;
            };
            let (f1, rest) = bytes.split_at(widths[0]);
            let (f2, f3) = rest.split_at(widths[1]);
            let kind = if widths[0] == 0 { 1 } else { read_be(f1) };
            let (field2, field3) = (read_be(f2), read_be(f3));
            let number = start.saturating_add(i);
            let entry = match kind {
                0 => XRefEntry::free(field2 as u32, field3 as u16),
                1 => XRefEntry::uncompressed(field2 as usize, field3 as u16),
                2 => XRefEntry::compressed(field2 as u32, field3 as u32),
                // Unknown types are references to the null object
                _ => continue,
            };
            table.add_entry(number, entry);
        }
    }

    table.set_trailer(dict.clone());
    Ok(table)
}

/// Big-endian unsigned integer of up to 8 bytes.
fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASSIC: &[u8] = b"%PDF-1.4\n\
xref\n\
0 3\n\
0000000000 65535 f \n\
0000000018 00000 n \n\
0000000077 00000 n \n\
trailer\n\
<< /Size 3 /Root 1 0 R >>\n\
startxref\n\
9\n\
%%EOF\n";

    #[test]
    fn test_find_startxref() {
        assert_eq!(find_startxref(CLASSIC).unwrap(), 9);
    }

    #[test]
    fn test_find_startxref_missing() {
        assert!(matches!(find_startxref(b"%PDF-1.4\n%%EOF"), Err(Error::MalformedDocument(_))));
    }

    #[test]
    fn test_find_startxref_cr_line_endings() {
        let data = b"%PDF-1.4\rxref\r0 0\rtrailer\r<<>>\rstartxref\r9\r%%EOF";
        assert_eq!(find_startxref(data).unwrap(), 9);
    }

    #[test]
    fn test_classic_table() {
        let table = read_xref_chain(CLASSIC, 9, &ParserOptions::default()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(1), Some(&XRefEntry::uncompressed(18, 0)));
        assert_eq!(table.get(2), Some(&XRefEntry::uncompressed(77, 0)));
        assert!(!table.contains(0));
        assert_eq!(table.trailer().get("Size").and_then(|v| v.as_integer()), Some(3));
    }

    #[test]
    fn test_multiple_subsections() {
        let data = b"xref\n0 1\n0000000000 65535 f \n5 2\n0000000100 00000 n \n0000000200 00001 n \ntrailer\n<< /Size 7 >>";
        let table = read_section(data, 0, &ParserOptions::default()).unwrap();
        assert_eq!(table.get(5), Some(&XRefEntry::uncompressed(100, 0)));
        assert_eq!(table.get(6), Some(&XRefEntry::uncompressed(200, 1)));
        assert_eq!(table.max_object_number(), 6);
    }

    #[test]
    fn test_short_subsection_tolerated() {
        let data = b"xref\n0 4\n0000000000 65535 f \n0000000010 00000 n \ntrailer\n<< /Size 4 >>";
        let table = read_section(data, 0, &ParserOptions::default()).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_missing_trailer_is_error() {
        let data = b"xref\n0 1\n0000000000 65535 f \n";
        assert!(read_section(data, 0, &ParserOptions::default()).is_err());
    }

    #[test]
    fn test_prev_chain_newer_wins() {
        let mut data = Vec::new();
        data.extend_from_slice(
            b"xref\n0 2\n0000000000 65535 f \n0000000100 00000 n \ntrailer\n<< /Size 2 /Root 1 0 R /Info 9 0 R >>\n",
        );
        let second = data.len();
        data.extend_from_slice(b"xref\n1 1\n0000000500 00000 n \ntrailer\n<< /Size 2 /Root 1 0 R /Prev 0 >>\n");
        let table = read_xref_chain(&data, second, &ParserOptions::default()).unwrap();
        assert_eq!(table.get(1), Some(&XRefEntry::uncompressed(500, 0)));
        assert!(table.trailer().contains_key("Info"));
    }

    #[test]
    fn test_prev_loop_detected() {
        let data = b"xref\n0 1\n0000000000 65535 f \ntrailer\n<< /Size 1 /Prev 0 >>";
        let table = read_xref_chain(data, 0, &ParserOptions::default()).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_xref_stream_uncompressed() {
        // W [1 2 1]: type, offset, gen
        let rows: Vec<u8> = vec![0, 0, 0, 0xFF, 1, 0, 0x0F, 0, 2, 0, 0x05, 0];
        let mut data = Vec::new();
        data.extend_from_slice(
            format!(
                "7 0 obj\n<< /Type /XRef /Size 3 /W [1 2 1] /Root 1 0 R /Length {} >>\nstream\n",
                rows.len()
            )
            .as_bytes(),
        );
        data.extend_from_slice(&rows);
        data.extend_from_slice(b"\nendstream\nendobj\n");

        let table = read_section(&data, 0, &ParserOptions::default()).unwrap();
        assert_eq!(table.get(1), Some(&XRefEntry::uncompressed(15, 0)));
        assert_eq!(table.get(2), Some(&XRefEntry::compressed(5, 0)));
        assert!(table.trailer().contains_key("Root"));
    }

    #[test]
    fn test_read_be() {
        assert_eq!(read_be(&[]), 0);
        assert_eq!(read_be(&[0x01, 0x00]), 256);
    }
}
