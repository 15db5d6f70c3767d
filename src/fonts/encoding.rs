//! Single-byte font encodings and glyph names.
//!
//! Simple fonts map each byte to a glyph through a base encoding, optionally
//! patched by a `/Differences` array of glyph names.
//!
//! PDF Spec: ISO 32000-1:2008, Annex D (Character Sets and Encodings)

use std::collections::HashMap;

/// The predefined base encodings of simple fonts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseEncoding {
    /// Adobe StandardEncoding, the implicit default of Type 1 fonts
    Standard,
    /// Windows code page 1252
    WinAnsi,
    /// Mac OS Roman
    MacRoman,
    /// PDFDocEncoding, used for text strings outside content streams
    PdfDoc,
}

impl BaseEncoding {
    /// Map an `/Encoding` or `/BaseEncoding` name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "StandardEncoding" => Some(BaseEncoding::Standard),
            "WinAnsiEncoding" => Some(BaseEncoding::WinAnsi),
            "MacRomanEncoding" => Some(BaseEncoding::MacRoman),
            "PDFDocEncoding" => Some(BaseEncoding::PdfDoc),
            _ => None,
        }
    }

    /// Character for a code in this encoding.
    pub fn lookup(self, code: u8) -> Option<char> {
        match self {
            BaseEncoding::PdfDoc => pdfdoc_char(code),
            BaseEncoding::WinAnsi => match code {
                0x20..=0x7E => Some(code as char),
                0x80..=0x9F => table_char(&WIN_ANSI_HIGH, code - 0x80),
                0xA0..=0xFF => Some(code as char),
                _ => None,
            },
            BaseEncoding::MacRoman => match code {
                0x20..=0x7E => Some(code as char),
                0x80..=0xFF => table_char(&MAC_ROMAN_HIGH, code - 0x80),
                _ => None,
            },
            BaseEncoding::Standard => match code {
                0x27 => Some('\u{2019}'),
                0x60 => Some('\u{2018}'),
                0x20..=0x7E => Some(code as char),
                0xA0..=0xFF => table_char(&STANDARD_HIGH, code - 0xA0),
                _ => None,
            },
        }
    }
}

fn table_char(table: &[u16], index: u8) -> Option<char> {
    match table.get(index as usize) {
        Some(0) | None => None,
        Some(&unit) => char::from_u32(unit as u32),
    }
}

/// Windows-1252 codes 0x80-0x9F. Zero marks an undefined code.
const WIN_ANSI_HIGH: [u16; 32] = [
    0x20AC, 0x0000, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, //
    0x02C6, 0x2030, 0x0160, 0x2039, 0x0152, 0x0000, 0x017D, 0x0000, //
    0x0000, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0x2013, 0x2014, //
    0x02DC, 0x2122, 0x0161, 0x203A, 0x0153, 0x0000, 0x017E, 0x0178, //
];

/// Mac OS Roman codes 0x80-0xFF.
const MAC_ROMAN_HIGH: [u16; 128] = [
    0x00C4, 0x00C5, 0x00C7, 0x00C9, 0x00D1, 0x00D6, 0x00DC, 0x00E1, //
    0x00E0, 0x00E2, 0x00E4, 0x00E3, 0x00E5, 0x00E7, 0x00E9, 0x00E8, //
    0x00EA, 0x00EB, 0x00ED, 0x00EC, 0x00EE, 0x00EF, 0x00F1, 0x00F3, //
    0x00F2, 0x00F4, 0x00F6, 0x00F5, 0x00FA, 0x00F9, 0x00FB, 0x00FC, //
    0x2020, 0x00B0, 0x00A2, 0x00A3, 0x00A7, 0x2022, 0x00B6, 0x00DF, //
    0x00AE, 0x00A9, 0x2122, 0x00B4, 0x00A8, 0x2260, 0x00C6, 0x00D8, //
    0x221E, 0x00B1, 0x2264, 0x2265, 0x00A5, 0x00B5, 0x2202, 0x2211, //
    0x220F, 0x03C0, 0x222B, 0x00AA, 0x00BA, 0x03A9, 0x00E6, 0x00F8, //
    0x00BF, 0x00A1, 0x00AC, 0x221A, 0x0192, 0x2248, 0x2206, 0x00AB, //
    0x00BB, 0x2026, 0x00A0, 0x00C0, 0x00C3, 0x00D5, 0x0152, 0x0153, //
    0x2013, 0x2014, 0x201C, 0x201D, 0x2018, 0x2019, 0x00F7, 0x25CA, //
    0x00FF, 0x0178, 0x2044, 0x00A4, 0x2039, 0x203A, 0xFB01, 0xFB02, //
    0x2021, 0x00B7, 0x201A, 0x201E, 0x2030, 0x00C2, 0x00CA, 0x00C1, //
    0x00CB, 0x00C8, 0x00CD, 0x00CE, 0x00CF, 0x00CC, 0x00D3, 0x00D4, //
    0x0000, 0x00D2, 0x00DA, 0x00DB, 0x00D9, 0x0131, 0x02C6, 0x02DC, //
    0x00AF, 0x02D8, 0x02D9, 0x02DA, 0x00B8, 0x02DD, 0x02DB, 0x02C7, //
];

/// StandardEncoding codes 0xA0-0xFF.
const STANDARD_HIGH: [u16; 96] = [
    0x0000, 0x00A1, 0x00A2, 0x00A3, 0x2044, 0x00A5, 0x0192, 0x00A7, //
    0x00A4, 0x0027, 0x201C, 0x00AB, 0x2039, 0x203A, 0xFB01, 0xFB02, //
    0x0000, 0x2013, 0x2020, 0x2021, 0x00B7, 0x0000, 0x00B6, 0x2022, //
    0x201A, 0x201E, 0x201D, 0x00BB, 0x2026, 0x2030, 0x0000, 0x00BF, //
    0x0000, 0x0060, 0x00B4, 0x02C6, 0x02DC, 0x00AF, 0x02D8, 0x02D9, //
    0x00A8, 0x0000, 0x02DA, 0x00B8, 0x0000, 0x02DD, 0x02DB, 0x02C7, //
    0x2014, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, //
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, //
    0x0000, 0x00C6, 0x0000, 0x00AA, 0x0000, 0x0000, 0x0000, 0x0000, //
    0x0141, 0x00D8, 0x0152, 0x00BA, 0x0000, 0x0000, 0x0000, 0x0000, //
    0x0000, 0x00E6, 0x0000, 0x0000, 0x0000, 0x0131, 0x0000, 0x0000, //
    0x0142, 0x00F8, 0x0153, 0x00DF, 0x0000, 0x0000, 0x0000, 0x0000, //
];

/// PDFDocEncoding codes 0x80-0x9F.
const PDFDOC_HIGH: [u16; 32] = [
    0x2022, 0x2020, 0x2021, 0x2026, 0x2014, 0x2013, 0x0192, 0x2044, //
    0x2039, 0x203A, 0x2212, 0x2030, 0x201E, 0x201C, 0x201D, 0x2018, //
    0x2019, 0x201A, 0x2122, 0xFB01, 0xFB02, 0x0141, 0x0152, 0x0160, //
    0x0178, 0x017D, 0x0131, 0x0142, 0x0153, 0x0161, 0x017E, 0x0000, //
];

/// Look up a byte in PDFDocEncoding.
///
/// Codes below 0x80 are ASCII, 0x80-0x9F are typographic symbols and
/// 0xA0-0xFF follow ISO Latin-1. 0x9F and 0xAD are undefined.
pub fn pdfdoc_char(code: u8) -> Option<char> {
    match code {
        0x00..=0x7F => Some(code as char),
        0x80..=0x9F => table_char(&PDFDOC_HIGH, code - 0x80),
        0xAD => None,
        _ => Some(code as char),
    }
}

/// Reverse of [`pdfdoc_char`].
pub fn pdfdoc_byte(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x00..=0x7F => Some(code as u8),
        0xA0..=0xFF if code != 0xAD => Some(code as u8),
        _ => PDFDOC_HIGH
            .iter()
            .position(|&unit| unit != 0 && unit as u32 == code)
            .map(|i| 0x80 + i as u8),
    }
}

lazy_static::lazy_static! {
    static ref GLYPH_NAMES: HashMap<&'static str, char> = GLYPH_TABLE.iter().copied().collect();
}

/// Common glyph names from the Adobe Glyph List. Single-letter names map to
/// themselves and are handled separately.
const GLYPH_TABLE: &[(&str, char)] = &[
    ("space", ' '), ("exclam", '!'), ("quotedbl", '"'), ("numbersign", '#'),
    ("dollar", '$'), ("percent", '%'), ("ampersand", '&'), ("quotesingle", '\''),
    ("quoteright", '\u{2019}'), ("parenleft", '('), ("parenright", ')'),
    ("asterisk", '*'), ("plus", '+'), ("comma", ','), ("hyphen", '-'),
    ("period", '.'), ("slash", '/'), ("zero", '0'), ("one", '1'), ("two", '2'),
    ("three", '3'), ("four", '4'), ("five", '5'), ("six", '6'), ("seven", '7'),
    ("eight", '8'), ("nine", '9'), ("colon", ':'), ("semicolon", ';'),
    ("less", '<'), ("equal", '='), ("greater", '>'), ("question", '?'), ("at", '@'),
    ("bracketleft", '['), ("backslash", '\\'), ("bracketright", ']'),
    ("asciicircum", '^'), ("underscore", '_'), ("grave", '`'),
    ("quoteleft", '\u{2018}'), ("braceleft", '{'), ("bar", '|'),
    ("braceright", '}'), ("asciitilde", '~'), ("exclamdown", '\u{A1}'),
    ("cent", '\u{A2}'), ("sterling", '\u{A3}'), ("currency", '\u{A4}'),
    ("yen", '\u{A5}'), ("brokenbar", '\u{A6}'), ("section", '\u{A7}'),
    ("dieresis", '\u{A8}'), ("copyright", '\u{A9}'), ("ordfeminine", '\u{AA}'),
    ("guillemotleft", '\u{AB}'), ("logicalnot", '\u{AC}'), ("registered", '\u{AE}'),
    ("macron", '\u{AF}'), ("degree", '\u{B0}'), ("plusminus", '\u{B1}'),
    ("twosuperior", '\u{B2}'), ("threesuperior", '\u{B3}'), ("acute", '\u{B4}'),
    ("mu", '\u{B5}'), ("paragraph", '\u{B6}'), ("periodcentered", '\u{B7}'),
    ("cedilla", '\u{B8}'), ("onesuperior", '\u{B9}'), ("ordmasculine", '\u{BA}'),
    ("guillemotright", '\u{BB}'), ("onequarter", '\u{BC}'), ("onehalf", '\u{BD}'),
    ("threequarters", '\u{BE}'), ("questiondown", '\u{BF}'), ("Agrave", '\u{C0}'),
    ("Aacute", '\u{C1}'), ("Acircumflex", '\u{C2}'), ("Atilde", '\u{C3}'),
    ("Adieresis", '\u{C4}'), ("Aring", '\u{C5}'), ("AE", '\u{C6}'),
    ("Ccedilla", '\u{C7}'), ("Egrave", '\u{C8}'), ("Eacute", '\u{C9}'),
    ("Ecircumflex", '\u{CA}'), ("Edieresis", '\u{CB}'), ("Igrave", '\u{CC}'),
    ("Iacute", '\u{CD}'), ("Icircumflex", '\u{CE}'), ("Idieresis", '\u{CF}'),
    ("Eth", '\u{D0}'), ("Ntilde", '\u{D1}'), ("Ograve", '\u{D2}'),
    ("Oacute", '\u{D3}'), ("Ocircumflex", '\u{D4}'), ("Otilde", '\u{D5}'),
    ("Odieresis", '\u{D6}'), ("multiply", '\u{D7}'), ("Oslash", '\u{D8}'),
    ("Ugrave", '\u{D9}'), ("Uacute", '\u{DA}'), ("Ucircumflex", '\u{DB}'),
    ("Udieresis", '\u{DC}'), ("Yacute", '\u{DD}'), ("Thorn", '\u{DE}'),
    ("germandbls", '\u{DF}'), ("agrave", '\u{E0}'), ("aacute", '\u{E1}'),
    ("acircumflex", '\u{E2}'), ("atilde", '\u{E3}'), ("adieresis", '\u{E4}'),
    ("aring", '\u{E5}'), ("ae", '\u{E6}'), ("ccedilla", '\u{E7}'),
    ("egrave", '\u{E8}'), ("eacute", '\u{E9}'), ("ecircumflex", '\u{EA}'),
    ("edieresis", '\u{EB}'), ("igrave", '\u{EC}'), ("iacute", '\u{ED}'),
    ("icircumflex", '\u{EE}'), ("idieresis", '\u{EF}'), ("eth", '\u{F0}'),
    ("ntilde", '\u{F1}'), ("ograve", '\u{F2}'), ("oacute", '\u{F3}'),
    ("ocircumflex", '\u{F4}'), ("otilde", '\u{F5}'), ("odieresis", '\u{F6}'),
    ("divide", '\u{F7}'), ("oslash", '\u{F8}'), ("ugrave", '\u{F9}'),
    ("uacute", '\u{FA}'), ("ucircumflex", '\u{FB}'), ("udieresis", '\u{FC}'),
    ("yacute", '\u{FD}'), ("thorn", '\u{FE}'), ("ydieresis", '\u{FF}'),
    ("dotlessi", '\u{131}'), ("Lslash", '\u{141}'), ("lslash", '\u{142}'),
    ("OE", '\u{152}'), ("oe", '\u{153}'), ("Scaron", '\u{160}'),
    ("scaron", '\u{161}'), ("Ydieresis", '\u{178}'), ("Zcaron", '\u{17D}'),
    ("zcaron", '\u{17E}'), ("florin", '\u{192}'), ("circumflex", '\u{2C6}'),
    ("caron", '\u{2C7}'), ("breve", '\u{2D8}'), ("dotaccent", '\u{2D9}'),
    ("ring", '\u{2DA}'), ("ogonek", '\u{2DB}'), ("tilde", '\u{2DC}'),
    ("hungarumlaut", '\u{2DD}'), ("endash", '\u{2013}'), ("emdash", '\u{2014}'),
    ("quotesinglbase", '\u{201A}'), ("quotedblleft", '\u{201C}'),
    ("quotedblright", '\u{201D}'), ("quotedblbase", '\u{201E}'),
    ("dagger", '\u{2020}'), ("daggerdbl", '\u{2021}'), ("bullet", '\u{2022}'),
    ("ellipsis", '\u{2026}'), ("perthousand", '\u{2030}'),
    ("guilsinglleft", '\u{2039}'), ("guilsinglright", '\u{203A}'),
    ("fraction", '\u{2044}'), ("Euro", '\u{20AC}'), ("trademark", '\u{2122}'),
    ("minus", '\u{2212}'), ("ff", '\u{FB00}'), ("fi", '\u{FB01}'),
    ("fl", '\u{FB02}'), ("ffi", '\u{FB03}'), ("ffl", '\u{FB04}'),
    ("nbspace", '\u{A0}'), ("sfthyphen", '\u{AD}'),
];

/// Map a glyph name to text.
///
/// Understands the common Adobe Glyph List names, single ASCII letters,
/// `uniXXXX` (one or more four-digit groups) and `uXXXX`-`uXXXXXX`. A suffix
/// after `.` (`a.sc`, `one.oldstyle`) is ignored.
pub fn glyph_name_to_unicode(name: &str) -> Option<String> {
    let base = name.split('.').next().unwrap_or(name);
    if base.is_empty() {
        return None;
    }
    if base.len() == 1 && base.as_bytes()[0].is_ascii_alphabetic() {
        return Some(base.to_string());
    }
    if let Some(&c) = GLYPH_NAMES.get(base) {
        return Some(c.to_string());
    }
    if let Some(hex) = base.strip_prefix("uni") {
        if !hex.is_empty() && hex.len() % 4 == 0 {
            let units: Option<Vec<u16>> = (0..hex.len())
                .step_by(4)
                .map(|i| u16::from_str_radix(&hex[i..i + 4], 16).ok())
                .collect();
            if let Some(units) = units {
                return String::from_utf16(&units).ok();
            }
        }
    }
    if let Some(hex) = base.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) {
            if let Some(c) = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
                return Some(c.to_string());
            }
        }
    }
    log::debug!("Unknown glyph name '{}'", name);
    None
}

/// A base encoding patched with `/Differences`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleEncoding {
    base: BaseEncoding,
    differences: HashMap<u8, String>,
}

impl SimpleEncoding {
    /// An unpatched base encoding.
    pub fn new(base: BaseEncoding) -> Self {
        Self {
            base,
            differences: HashMap::new(),
        }
    }

    /// Apply a `/Differences` array: a code followed by glyph names for
    /// consecutive codes, repeated.
    ///
    /// ```
    /// use pdf_handler::fonts::encoding::{BaseEncoding, SimpleEncoding};
    /// use pdf_handler::object::PdfValue;
    ///
    /// let mut enc = SimpleEncoding::new(BaseEncoding::WinAnsi);
    /// enc.apply_differences(&[PdfValue::Integer(65), PdfValue::name("bullet")]);
    /// assert_eq!(enc.decode_byte(65).as_deref(), Some("\u{2022}"));
    /// ```
    pub fn apply_differences(&mut self, differences: &[crate::object::PdfValue]) {
        let mut code: Option<u32> = None;
        for item in differences {
            if let Some(n) = item.as_integer() {
                code = u32::try_from(n).ok();
            } else if let Some(name) = item.as_name() {
                let Some(current) = code else { continue };
                if let (Ok(byte), Some(text)) = (u8::try_from(current), glyph_name_to_unicode(name)) {
                    self.differences.insert(byte, text);
                }
                code = Some(current + 1);
            }
        }
    }

    /// Text for one byte.
    pub fn decode_byte(&self, code: u8) -> Option<String> {
        if let Some(text) = self.differences.get(&code) {
            return Some(text.clone());
        }
        self.base.lookup(code).map(|c| c.to_string())
    }

    /// Decode a string operand byte by byte. Unmapped codes are dropped.
    pub fn decode(&self, bytes: &[u8]) -> String {
        bytes.iter().filter_map(|&b| self.decode_byte(b)).collect()
    }
}
