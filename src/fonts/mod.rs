//! Font handling for text extraction.
//!
//! Character codes in string operands are mapped to Unicode through, in order
//! of preference, the font's ToUnicode CMap, its simple-font encoding (a base
//! encoding patched with `/Differences`), or Identity two-byte codes.

pub mod cmap;
pub mod encoding;
pub mod font_dict;

pub use cmap::ToUnicodeCMap;
pub use encoding::{glyph_name_to_unicode, pdfdoc_byte, pdfdoc_char, BaseEncoding, SimpleEncoding};
pub use font_dict::FontDecoder;
