//! ToUnicode CMap parser.
//!
//! A ToUnicode CMap maps character codes of a font to Unicode text. Codes may
//! be one to four bytes wide; the `codespacerange` sections say how many bytes
//! to consume for each code.
//!
//! ```text
//! begincodespacerange
//! <0000> <FFFF>
//! endcodespacerange
//! beginbfchar
//! <0003> <0020>
//! endbfchar
//! beginbfrange
//! <0041> <005A> <0041>
//! <005F> <0061> [<00660066> <00660069> <00660066006C>]
//! endbfrange
//! ```
//!
//! PDF Spec: ISO 32000-1:2008, Section 9.10.3 - ToUnicode CMaps

use regex::Regex;
use std::collections::HashMap;

/// Upper bound on the codes generated from one `bfrange` entry.
const MAX_RANGE: u32 = 0xFFFF;

lazy_static::lazy_static! {
    static ref RE_CODESPACE: Regex =
        Regex::new(r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>").unwrap();
    static ref RE_BFCHAR: Regex =
        Regex::new(r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]*)>").unwrap();
    static ref RE_BFRANGE: Regex = Regex::new(
        r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>\s*(?:<([0-9A-Fa-f]*)>|\[((?:\s*<[0-9A-Fa-f]*>)*)\s*\])"
    )
    .unwrap();
    static ref RE_HEX: Regex = Regex::new(r"<([0-9A-Fa-f]*)>").unwrap();
}

/// A code space range: codes of `width` bytes between `low` and `high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CodeSpace {
    low: u32,
    high: u32,
    width: usize,
}

/// Parsed ToUnicode mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToUnicodeCMap {
    codespaces: Vec<CodeSpace>,
    mappings: HashMap<u32, String>,
    /// Code width used when no code space range matches.
    default_width: usize,
}

impl ToUnicodeCMap {
    /// Parse a decoded ToUnicode stream.
    ///
    /// Malformed entries are skipped; a CMap with no usable entry still parses.
    ///
    /// ```
    /// use pdf_handler::fonts::cmap::ToUnicodeCMap;
    ///
    /// let cmap = ToUnicodeCMap::parse(b"1 beginbfchar\n<01> <0048>\nendbfchar");
    /// assert_eq!(cmap.lookup(0x01), Some("H"));
    /// ```
    pub fn parse(data: &[u8]) -> Self {
        let content = String::from_utf8_lossy(data);
        let mut cmap = ToUnicodeCMap::default();
        let mut widest_source = 0;

        for section in extract_sections(&content, "begincodespacerange", "endcodespacerange") {
            for caps in RE_CODESPACE.captures_iter(section) {
                let (Some(low), Some(high)) = (parse_code(&caps[1]), parse_code(&caps[2])) else {
                    continue;
                };
                cmap.codespaces.push(CodeSpace {
                    low,
                    high,
                    width: (caps[1].len() + 1) / 2,
                });
            }
        }

        for section in extract_sections(&content, "beginbfchar", "endbfchar") {
            for caps in RE_BFCHAR.captures_iter(section) {
                let Some(src) = parse_code(&caps[1]) else { continue };
                widest_source = widest_source.max((caps[1].len() + 1) / 2);
                if let Some(dst) = decode_destination(&caps[2]) {
                    log::trace!("ToUnicode bfchar: 0x{:X} -> {:?}", src, dst);
                    cmap.mappings.insert(src, dst);
                }
            }
        }

        for section in extract_sections(&content, "beginbfrange", "endbfrange") {
            for caps in RE_BFRANGE.captures_iter(section) {
                let (Some(start), Some(end)) = (parse_code(&caps[1]), parse_code(&caps[2])) else {
                    continue;
                };
                if end < start || end - start > MAX_RANGE {
                    log::warn!("Skipping ToUnicode bfrange 0x{:X}-0x{:X}", start, end);
                    continue;
                }
                widest_source = widest_source.max((caps[1].len() + 1) / 2);
                if let Some(dst) = caps.get(3) {
                    cmap.insert_sequential(start, end, dst.as_str());
                } else if let Some(array) = caps.get(4) {
                    let targets: Vec<&str> = RE_HEX
                        .captures_iter(array.as_str())
                        .filter_map(|c| c.get(1).map(|m| m.as_str()))
                        .collect();
                    if targets.len() != (end - start + 1) as usize {
                        log::warn!(
                            "ToUnicode bfrange array has {} entries for range 0x{:X}-0x{:X}",
                            targets.len(),
                            start,
                            end
                        );
                    }
                    for (code, hex) in (start..=end).zip(targets) {
                        if let Some(dst) = decode_destination(hex) {
                            cmap.mappings.insert(code, dst);
                        }
                    }
                }
            }
        }

        cmap.default_width = if widest_source == 0 { 2 } else { widest_source.min(4) };
        log::debug!(
            "Parsed ToUnicode CMap: {} mappings, {} code space ranges",
            cmap.mappings.len(),
            cmap.codespaces.len()
        );
        cmap
    }

    /// `<lo> <hi> <dst>`: consecutive codes map to consecutive destinations,
    /// incrementing the last UTF-16 unit of the destination.
    fn insert_sequential(&mut self, start: u32, end: u32, dst_hex: &str) {
        let Some(mut units) = hex_to_units(dst_hex) else {
            return;
        };
        if units.is_empty() {
            return;
        }
        let last = units.len() - 1;
        let base = units[last];
        for (offset, code) in (start..=end).enumerate() {
            let Some(unit) = base.checked_add(offset as u16) else {
                break;
            };
            units[last] = unit;
            self.mappings.insert(code, String::from_utf16_lossy(&units));
        }
    }

    /// Text for one code.
    pub fn lookup(&self, code: u32) -> Option<&str> {
        self.mappings.get(&code).map(|s| s.as_str())
    }

    /// Number of mapped codes.
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Whether no code is mapped.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Split a string operand into `(code, byte width)` pairs.
    pub fn codes(&self, bytes: &[u8]) -> Vec<(u32, usize)> {
        let mut codes = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let width = self.code_width(&bytes[pos..]);
            let code = bytes[pos..pos + width]
                .iter()
                .fold(0u32, |acc, &b| (acc << 8) | b as u32);
            codes.push((code, width));
            pos += width;
        }
        codes
    }

    /// Decode a string operand. Unmapped codes are dropped.
    pub fn decode(&self, bytes: &[u8]) -> String {
        let mut text = String::new();
        for (code, _) in self.codes(bytes) {
            match self.lookup(code) {
                Some(s) => text.push_str(s),
                None => log::trace!("ToUnicode has no entry for 0x{:X}", code),
            }
        }
        text
    }

    fn code_width(&self, bytes: &[u8]) -> usize {
        for width in 1..=bytes.len().min(4) {
            let code = bytes[..width].iter().fold(0u32, |acc, &b| (acc << 8) | b as u32);
            if self
                .codespaces
                .iter()
                .any(|cs| cs.width == width && cs.low <= code && code <= cs.high)
            {
                return width;
            }
        }
        self.default_width.clamp(1, bytes.len())
    }
}

/// Extract sections between begin and end markers.
fn extract_sections<'a>(content: &'a str, begin: &str, end: &str) -> Vec<&'a str> {
    let mut sections = Vec::new();
    let mut remaining = content;

    while let Some(begin_pos) = remaining.find(begin) {
        let after_begin = &remaining[begin_pos + begin.len()..];
        match after_begin.find(end) {
            Some(end_pos) => {
                sections.push(&after_begin[..end_pos]);
                remaining = &after_begin[end_pos + end.len()..];
            },
            None => break,
        }
    }

    sections
}

fn parse_code(hex: &str) -> Option<u32> {
    if hex.is_empty() || hex.len() > 8 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

fn hex_to_units(hex: &str) -> Option<Vec<u16>> {
    if hex.len() % 4 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(4)
        .map(|i| u16::from_str_radix(&hex[i..i + 4], 16).ok())
        .collect()
}

/// Destination strings are UTF-16BE, which covers surrogate pairs and
/// multi-character ligatures. Short odd-sized values are taken as a code point.
fn decode_destination(hex: &str) -> Option<String> {
    if let Some(units) = hex_to_units(hex) {
        if units.is_empty() {
            return None;
        }
        return Some(String::from_utf16_lossy(&units));
    }
    u32::from_str_radix(hex, 16)
        .ok()
        .and_then(char::from_u32)
        .map(|c| c.to_string())
}
