//! Object stream parsing (PDF 1.5+).
//!
//! An object stream (`/Type /ObjStm`) packs several indirect objects into one
//! filtered stream:
//!
//! ```text
//! 12 0 obj
//! << /Type /ObjStm /N 2 /First 10 /Filter /FlateDecode >>
//! stream
//! 10 0 11 15        % pairs: object number, offset relative to /First
//! << /A 1 >>        % object 10
//! [ 1 2 3 ]         % object 11
//! endstream
//! ```
//!
//! Decryption and filter decoding happen before the stream reaches this module.

use crate::error::{Error, Result};
use crate::lexer::{Token, token};
use crate::object::{Dictionary, PdfValue};
use crate::parser::ObjectParser;
use crate::parser_config::ParserOptions;

/// Upper bound on `/N`.
const MAX_OBJECTS: i64 = 1_000_000;

/// A decoded object stream, ready for random access by index.
#[derive(Debug, Clone)]
pub struct ObjectStream {
    pairs: Vec<(u32, usize)>,
    body: Vec<u8>,
}

impl ObjectStream {
    /// Parse the header of a decoded object stream.
    pub fn parse(dict: &Dictionary, decoded: Vec<u8>) -> Result<Self> {
        if let Some(kind) = dict.get("Type").and_then(|t| t.as_name()) {
            if kind != "ObjStm" {
                return Err(Error::malformed(format!("expected /Type /ObjStm, got /{}", kind)));
            }
        }
        let n = dict
            .get("N")
            .and_then(|v| v.as_integer())
            .filter(|n| (0..=MAX_OBJECTS).contains(n))
            .ok_or_else(|| Error::malformed("object stream has no valid /N"))? as usize;
        let first = dict
            .get("First")
            .and_then(|v| v.as_integer())
            .filter(|f| *f >= 0 && (*f as usize) <= decoded.len())
            .ok_or_else(|| Error::malformed("object stream has no valid /First"))? as usize;

        let pairs = parse_pairs(&decoded[..first], n);
        if pairs.len() < n {
            log::warn!("Object stream declares {} objects but lists {}", n, pairs.len());
        }
        let body = decoded[first..].to_vec();
        Ok(Self { pairs, body })
    }

    /// Object numbers in stream order.
    pub fn object_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.pairs.iter().map(|(n, _)| *n)
    }

    /// Number of objects listed.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the stream lists no objects.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Parse the object at `index`. Falls back to searching by object number
    /// when the index does not match, as some writers number slots loosely.
    pub fn object(&self, index: usize, id: u32, options: &ParserOptions) -> Result<PdfValue> {
        let slot = match self.pairs.get(index) {
            Some((n, off)) if *n == id => *off,
            _ => self
                .pairs
                .iter()
                .find(|(n, _)| *n == id)
                .map(|(_, off)| *off)
                .ok_or_else(|| Error::malformed(format!("object {} not in object stream", id)))?,
        };
        let data = self
            .body
            .get(slot..)
            .ok_or_else(|| Error::malformed(format!("object {} offset {} past stream end", id, slot)))?;
        ObjectParser::new(options)
            .parse(data)
            .map(|(_, value)| value)
            .map_err(|e| crate::parser::to_parse_error(data, slot, e))
    }
}

/// Read up to `count` `object offset` integer pairs.
fn parse_pairs(mut data: &[u8], count: usize) -> Vec<(u32, usize)> {
    let mut pairs = Vec::with_capacity(count.min(4096));
    while pairs.len() < count {
        let Ok((rest, Token::Integer(id))) = token(data) else {
            break;
        };
        let Ok((rest, Token::Integer(offset))) = token(rest) else {
            break;
        };
        if id < 0 || offset < 0 || id > u32::MAX as i64 {
            break;
        }
        pairs.push((id as u32, offset as usize));
        data = rest;
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_dict(n: i64, first: i64) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), PdfValue::name("ObjStm"));
        dict.insert("N".to_string(), PdfValue::Integer(n));
        dict.insert("First".to_string(), PdfValue::Integer(first));
        dict
    }

    #[test]
    fn test_parse_object_stream() {
        let data = b"10 0 11 11 << /A 1 >> [1 2 3]".to_vec();
        let stm = ObjectStream::parse(&stream_dict(2, 11), data).unwrap();
        assert_eq!(stm.object_numbers().collect::<Vec<_>>(), vec![10, 11]);

        let opts = ParserOptions::default();
        let first = stm.object(0, 10, &opts).unwrap();
        assert_eq!(first.get("A"), Some(&PdfValue::Integer(1)));
        let second = stm.object(1, 11, &opts).unwrap();
        assert_eq!(second.as_array().map(|a| a.len()), Some(3));
    }

    #[test]
    fn test_lookup_by_number_when_index_is_off() {
        let data = b"10 0 11 11 << /A 1 >> [1 2 3]".to_vec();
        let stm = ObjectStream::parse(&stream_dict(2, 11), data).unwrap();
        let value = stm.object(0, 11, &ParserOptions::default()).unwrap();
        assert!(value.as_array().is_some());
    }

    #[test]
    fn test_missing_object() {
        let stm = ObjectStream::parse(&stream_dict(1, 5), b"10 0 null".to_vec()).unwrap();
        assert!(stm.object(0, 99, &ParserOptions::default()).is_err());
    }

    #[test]
    fn test_invalid_first() {
        assert!(ObjectStream::parse(&stream_dict(1, 500), b"10 0 null".to_vec()).is_err());
    }

    #[test]
    fn test_wrong_type() {
        let mut dict = stream_dict(1, 5);
        dict.insert("Type".to_string(), PdfValue::name("XRef"));
        assert!(ObjectStream::parse(&dict, b"10 0 null".to_vec()).is_err());
    }
}
