//! PDF object model.
//!
//! [`PdfValue`] is the in-memory form of every PDF object. Composite values own
//! their children; links between indirect objects are always expressed as
//! [`PdfValue::Reference`] and resolved through the document.

use crate::error::{Error, Result};
use bytes::Bytes;
use indexmap::IndexMap;

/// A PDF dictionary. Keys are names without the leading slash.
pub type Dictionary = IndexMap<String, PdfValue>;

/// PDF object representation.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer number
    Integer(i64),
    /// Real number
    Real(f64),
    /// String (raw bytes, escapes already decoded)
    String(Vec<u8>),
    /// Name (without the leading /)
    Name(String),
    /// Array of objects
    Array(Vec<PdfValue>),
    /// Dictionary
    Dictionary(Dictionary),
    /// Stream: dictionary plus the raw (still filtered) payload
    Stream {
        /// Stream dictionary
        dict: Dictionary,
        /// Stream data as stored in the file
        data: Bytes,
    },
    /// Indirect object reference
    Reference(ObjectRef),
}

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

impl From<ObjectRef> for PdfValue {
    fn from(r: ObjectRef) -> Self {
        PdfValue::Reference(r)
    }
}

impl From<Dictionary> for PdfValue {
    fn from(d: Dictionary) -> Self {
        PdfValue::Dictionary(d)
    }
}

impl From<i64> for PdfValue {
    fn from(i: i64) -> Self {
        PdfValue::Integer(i)
    }
}

impl From<bool> for PdfValue {
    fn from(b: bool) -> Self {
        PdfValue::Boolean(b)
    }
}

impl PdfValue {
    /// Build a name value.
    pub fn name(name: impl Into<String>) -> Self {
        PdfValue::Name(name.into())
    }

    /// Build a string value from raw bytes.
    pub fn string(bytes: impl Into<Vec<u8>>) -> Self {
        PdfValue::String(bytes.into())
    }

    /// Build a stream value.
    pub fn stream(dict: Dictionary, data: impl Into<Bytes>) -> Self {
        PdfValue::Stream {
            dict,
            data: data.into(),
        }
    }

    /// Human-readable type name, without the data.
    pub fn type_name(&self) -> &'static str {
        match self {
            PdfValue::Null => "Null",
            PdfValue::Boolean(_) => "Boolean",
            PdfValue::Integer(_) => "Integer",
            PdfValue::Real(_) => "Real",
            PdfValue::String(_) => "String",
            PdfValue::Name(_) => "Name",
            PdfValue::Array(_) => "Array",
            PdfValue::Dictionary(_) => "Dictionary",
            PdfValue::Stream { .. } => "Stream",
            PdfValue::Reference(_) => "Reference",
        }
    }

    /// Try to cast to integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PdfValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value of an Integer or Real.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PdfValue::Integer(i) => Some(*i as f64),
            PdfValue::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            PdfValue::Name(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to dictionary. Works for both Dictionary and Stream objects.
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            PdfValue::Dictionary(d) => Some(d),
            PdfValue::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Mutable dictionary access for Dictionary and Stream objects.
    pub fn as_dict_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            PdfValue::Dictionary(d) => Some(d),
            PdfValue::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&Vec<PdfValue>> {
        match self {
            PdfValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to cast to reference.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            PdfValue::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PdfValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to cast to real number.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            PdfValue::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to string (bytes).
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            PdfValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Raw payload of a stream.
    pub fn stream_data(&self) -> Option<&Bytes> {
        match self {
            PdfValue::Stream { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Check if object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, PdfValue::Null)
    }

    /// Look up a key when this value is a dictionary or stream.
    pub fn get(&self, key: &str) -> Option<&PdfValue> {
        self.as_dict().and_then(|d| d.get(key))
    }

    /// `/Type` of a dictionary or stream.
    pub fn dict_type(&self) -> Option<&str> {
        self.get("Type").and_then(|t| t.as_name())
    }

    /// Decode the payload of a stream through its `/Filter` chain.
    ///
    /// Uses the default decompression limits; see
    /// [`crate::decoders::decode_stream_with_options`] for configurable limits.
    pub fn decode_stream_data(&self) -> Result<Vec<u8>> {
        crate::decoders::decode_stream(self)
    }

    /// Interpret this value as a PDF text string.
    pub fn as_text(&self) -> Option<String> {
        self.as_string().map(decode_text_string)
    }

    /// Collect every reference contained in this value, depth first.
    pub fn collect_references(&self, out: &mut Vec<ObjectRef>) {
        match self {
            PdfValue::Reference(r) => out.push(*r),
            PdfValue::Array(items) => items.iter().for_each(|v| v.collect_references(out)),
            PdfValue::Dictionary(d) | PdfValue::Stream { dict: d, .. } => {
                d.values().for_each(|v| v.collect_references(out))
            },
            _ => {},
        }
    }

    /// Error describing a type mismatch for this value.
    pub(crate) fn type_error(&self, expected: &str) -> Error {
        Error::InvalidObjectType {
            expected: expected.to_string(),
            found: self.type_name().to_string(),
        }
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, UTF-8 with BOM, or PDFDocEncoding).
pub fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks(2)
            .map(|c| {
                let hi = c[0] as u16;
                let lo = c.get(1).copied().unwrap_or(0) as u16;
                (hi << 8) | lo
            })
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if bytes.len() >= 3 && bytes[..3] == [0xEF, 0xBB, 0xBF] {
        return String::from_utf8_lossy(&bytes[3..]).into_owned();
    }
    bytes
        .iter()
        .filter_map(|&b| crate::fonts::pdfdoc_char(b))
        .collect()
}

/// Encode text for storage in a PDF string.
///
/// Text representable in PDFDocEncoding is stored as single bytes; anything else
/// becomes UTF-16BE with a byte order mark.
pub fn encode_text_string(text: &str) -> Vec<u8> {
    let single: Option<Vec<u8>> = text.chars().map(crate::fonts::pdfdoc_byte).collect();
    match single {
        Some(bytes) => bytes,
        None => {
            let mut out = vec![0xFE, 0xFF];
            for unit in text.encode_utf16() {
                out.extend_from_slice(&unit.to_be_bytes());
            }
            out
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_integer() {
        let obj = PdfValue::Integer(42);
        assert_eq!(obj.as_integer(), Some(42));
        assert_eq!(obj.as_number(), Some(42.0));
        assert!(obj.as_name().is_none());
        assert!(!obj.is_null());
    }

    #[test]
    fn test_object_name() {
        let obj = PdfValue::name("Type");
        assert_eq!(obj.as_name(), Some("Type"));
        assert!(obj.as_integer().is_none());
    }

    #[test]
    fn test_stream_dict_access() {
        let mut dict = Dictionary::new();
        dict.insert("Length".to_string(), PdfValue::Integer(11));
        let obj = PdfValue::stream(dict, Bytes::from_static(b"stream data"));

        assert_eq!(obj.get("Length").and_then(|v| v.as_integer()), Some(11));
        assert_eq!(obj.stream_data().map(|d| d.len()), Some(11));
    }

    #[test]
    fn test_dictionary_equality_ignores_order() {
        let mut a = Dictionary::new();
        a.insert("A".to_string(), PdfValue::Integer(1));
        a.insert("B".to_string(), PdfValue::Integer(2));
        let mut b = Dictionary::new();
        b.insert("B".to_string(), PdfValue::Integer(2));
        b.insert("A".to_string(), PdfValue::Integer(1));
        assert_eq!(PdfValue::Dictionary(a), PdfValue::Dictionary(b));
    }

    #[test]
    fn test_object_ref_display() {
        assert_eq!(format!("{}", ObjectRef::new(10, 0)), "10 0 R");
    }

    #[test]
    fn test_collect_references() {
        let mut dict = Dictionary::new();
        dict.insert("Kids".to_string(), PdfValue::Array(vec![
            ObjectRef::new(3, 0).into(),
            ObjectRef::new(4, 0).into(),
        ]));
        dict.insert("Parent".to_string(), ObjectRef::new(2, 0).into());
        let mut refs = Vec::new();
        PdfValue::Dictionary(dict).collect_references(&mut refs);
        assert_eq!(refs, vec![ObjectRef::new(3, 0), ObjectRef::new(4, 0), ObjectRef::new(2, 0)]);
    }

    #[test]
    fn test_text_string_pdfdoc() {
        assert_eq!(decode_text_string(b"Quarterly Report"), "Quarterly Report");
        assert_eq!(encode_text_string("caf\u{e9}"), b"caf\xe9".to_vec());
    }

    #[test]
    fn test_text_string_utf16() {
        let encoded = encode_text_string("\u{65e5}\u{672c}");
        assert_eq!(&encoded[..2], &[0xFE, 0xFF]);
        assert_eq!(decode_text_string(&encoded), "\u{65e5}\u{672c}");
    }

    #[test]
    fn test_decode_stream_not_a_stream() {
        let result = PdfValue::Integer(42).decode_stream_data();
        match result {
            Err(Error::InvalidObjectType { expected, found }) => {
                assert_eq!(expected, "Stream");
                assert_eq!(found, "Integer");
            },
            other => panic!("Expected InvalidObjectType error, got {:?}", other),
        }
    }
}
