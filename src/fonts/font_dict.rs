//! Font dictionaries as seen by the text interpreter.

use super::cmap::ToUnicodeCMap;
use super::encoding::{BaseEncoding, SimpleEncoding};
use crate::document::Document;
use crate::object::{Dictionary, PdfValue};

/// Maps the bytes of a string operand to Unicode for one font.
#[derive(Debug, Clone)]
pub struct FontDecoder {
    base_font: String,
    subtype: String,
    to_unicode: Option<ToUnicodeCMap>,
    encoding: SimpleEncoding,
    /// Type0 font: codes are multi-byte
    composite: bool,
}

impl Default for FontDecoder {
    /// Decoder used before any `Tf`: WinAnsi bytes.
    fn default() -> Self {
        Self {
            base_font: String::new(),
            subtype: String::new(),
            to_unicode: None,
            encoding: SimpleEncoding::new(BaseEncoding::WinAnsi),
            composite: false,
        }
    }
}

impl FontDecoder {
    /// Build a decoder from a font dictionary.
    ///
    /// Never fails: unreadable parts of the dictionary are logged and the
    /// corresponding fallback is used.
    pub fn load(doc: &Document, font: &Dictionary) -> Self {
        let name = |key: &str| {
            font.get(key)
                .and_then(|v| v.as_name())
                .unwrap_or_default()
                .to_string()
        };
        let base_font = name("BaseFont");
        let subtype = name("Subtype");
        let composite = subtype == "Type0";

        let to_unicode = font.get("ToUnicode").and_then(|stream| match doc.decode_stream(stream) {
            Ok(data) => {
                let cmap = ToUnicodeCMap::parse(&data);
                log::debug!("Font '{}': ToUnicode with {} entries", base_font, cmap.len());
                Some(cmap)
            },
            Err(e) => {
                log::warn!("Font '{}': unreadable ToUnicode ({})", base_font, e);
                None
            },
        });

        let default_base = if subtype == "Type1" || subtype == "MMType1" {
            BaseEncoding::Standard
        } else {
            BaseEncoding::WinAnsi
        };
        let encoding = if composite {
            SimpleEncoding::new(default_base)
        } else {
            Self::simple_encoding(doc, font.get("Encoding"), default_base, &base_font)
        };

        if composite && to_unicode.is_none() {
            log::warn!("Type0 font '{}' has no ToUnicode; reading codes as Unicode", base_font);
        }

        Self {
            base_font,
            subtype,
            to_unicode,
            encoding,
            composite,
        }
    }

    fn simple_encoding(
        doc: &Document,
        value: Option<&PdfValue>,
        default_base: BaseEncoding,
        base_font: &str,
    ) -> SimpleEncoding {
        let resolved = match value.map(|v| doc.resolve(v)) {
            None => return SimpleEncoding::new(default_base),
            Some(Ok(v)) => v,
            Some(Err(e)) => {
                log::warn!("Font '{}': unreadable /Encoding ({})", base_font, e);
                return SimpleEncoding::new(default_base);
            },
        };
        match resolved {
            PdfValue::Name(name) => SimpleEncoding::new(BaseEncoding::from_name(&name).unwrap_or_else(|| {
                log::debug!("Font '{}': unknown encoding /{}", base_font, name);
                default_base
            })),
            PdfValue::Dictionary(dict) => {
                let base = dict
                    .get("BaseEncoding")
                    .and_then(|b| b.as_name())
                    .and_then(BaseEncoding::from_name)
                    .unwrap_or(default_base);
                let mut encoding = SimpleEncoding::new(base);
                if let Some(differences) = dict.get("Differences") {
                    match doc.resolve(differences) {
                        Ok(PdfValue::Array(items)) => encoding.apply_differences(&items),
                        Ok(other) => log::warn!("Font '{}': /Differences is a {}", base_font, other.type_name()),
                        Err(e) => log::warn!("Font '{}': unreadable /Differences ({})", base_font, e),
                    }
                }
                encoding
            },
            other => {
                log::warn!("Font '{}': /Encoding is a {}", base_font, other.type_name());
                SimpleEncoding::new(default_base)
            },
        }
    }

    /// `/BaseFont` name, empty when absent.
    pub fn base_font(&self) -> &str {
        &self.base_font
    }

    /// `/Subtype`, empty when absent.
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// Whether the font uses multi-byte codes.
    pub fn is_composite(&self) -> bool {
        self.composite
    }

    /// Decode the bytes of a string operand.
    pub fn decode(&self, bytes: &[u8]) -> String {
        if self.composite {
            return self.decode_composite(bytes);
        }
        let mut text = String::new();
        for &byte in bytes {
            if let Some(mapped) = self.cmap_lookup(byte as u32) {
                text.push_str(mapped);
            } else if let Some(mapped) = self.encoding.decode_byte(byte) {
                text.push_str(&mapped);
            }
        }
        text
    }

    fn decode_composite(&self, bytes: &[u8]) -> String {
        let codes: Vec<u32> = match &self.to_unicode {
            Some(cmap) => cmap.codes(bytes).into_iter().map(|(code, _)| code).collect(),
            None => bytes
                .chunks(2)
                .map(|pair| pair.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32))
                .collect(),
        };
        let mut text = String::new();
        for code in codes {
            if let Some(mapped) = self.cmap_lookup(code) {
                text.push_str(mapped);
            } else if let Some(c) = char::from_u32(code).filter(|c| !c.is_control()) {
                text.push(c);
            }
        }
        text
    }

    /// ToUnicode entry, skipping U+FFFD placeholders some producers write for
    /// codes they could not map.
    fn cmap_lookup(&self, code: u32) -> Option<&str> {
        self.to_unicode
            .as_ref()
            .and_then(|cmap| cmap.lookup(code))
            .filter(|s| *s != "\u{FFFD}")
    }
}
