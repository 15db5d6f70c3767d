//! PDF object serialization.
//!
//! Serializes [`PdfValue`]s to their byte representation according to
//! PDF specification ISO 32000-1:2008, Section 7.3.

use crate::object::{Dictionary, PdfValue};

/// Serializer for PDF objects.
#[derive(Debug, Clone, Default)]
pub struct ObjectSerializer {
    /// Minimal whitespace inside dictionaries
    compact: bool,
}

impl ObjectSerializer {
    /// Create a serializer that puts dictionary entries on their own lines.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compact serializer (minimal whitespace).
    pub fn compact() -> Self {
        Self { compact: true }
    }

    /// Serialize an object to bytes.
    pub fn serialize(&self, obj: &PdfValue) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_object(&mut buf, obj);
        buf
    }

    /// Serialize an object to a string (for debugging).
    pub fn serialize_to_string(&self, obj: &PdfValue) -> String {
        String::from_utf8_lossy(&self.serialize(obj)).into_owned()
    }

    /// Serialize an indirect object definition.
    ///
    /// Format: `{id} {gen} obj\n{object}\nendobj\n`
    pub fn serialize_indirect(&self, id: u32, gen: u16, obj: &PdfValue) -> Vec<u8> {
        let mut buf = format!("{} {} obj\n", id, gen).into_bytes();
        self.write_object(&mut buf, obj);
        buf.extend_from_slice(b"\nendobj\n");
        buf
    }

    /// Append the serialization of `obj` to `out`.
    pub fn write_object(&self, out: &mut Vec<u8>, obj: &PdfValue) {
        match obj {
            PdfValue::Null => out.extend_from_slice(b"null"),
            PdfValue::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
            PdfValue::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
            PdfValue::Real(r) => write_real(out, *r),
            PdfValue::String(s) => write_string(out, s),
            PdfValue::Name(n) => write_name(out, n),
            PdfValue::Array(items) => {
                out.push(b'[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(b' ');
                    }
                    self.write_object(out, item);
                }
                out.push(b']');
            },
            PdfValue::Dictionary(dict) => self.write_dictionary(out, dict),
            PdfValue::Stream { dict, data } => {
                // Length always describes the bytes actually written
                let mut dict = dict.clone();
                dict.insert("Length".to_string(), PdfValue::Integer(data.len() as i64));
                self.write_dictionary(out, &dict);
                out.extend_from_slice(b"\nstream\n");
                out.extend_from_slice(data);
                out.extend_from_slice(b"\nendstream");
            },
            PdfValue::Reference(r) => out.extend_from_slice(format!("{} {} R", r.id, r.gen).as_bytes()),
        }
    }

    fn write_dictionary(&self, out: &mut Vec<u8>, dict: &Dictionary) {
        out.extend_from_slice(b"<<");
        for (key, value) in dict {
            out.extend_from_slice(if self.compact { b" " } else { b"\n  " });
            write_name(out, key);
            out.push(b' ');
            self.write_object(out, value);
        }
        if self.compact {
            out.push(b' ');
        } else if !dict.is_empty() {
            out.push(b'\n');
        }
        out.extend_from_slice(b">>");
    }
}

/// Real numbers with at most 5 decimals and no trailing zeros.
fn write_real(out: &mut Vec<u8>, value: f64) {
    if !value.is_finite() {
        out.push(b'0');
    } else if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        out.extend_from_slice((value as i64).to_string().as_bytes());
    } else {
        let formatted = format!("{:.5}", value);
        let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
        let trimmed = if trimmed == "-0" { "0" } else { trimmed };
        out.extend_from_slice(trimmed.as_bytes());
    }
}

/// Literal string for printable ASCII, hex string otherwise.
fn write_string(out: &mut Vec<u8>, data: &[u8]) {
    let printable = data
        .iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b'\t' || (0x20..=0x7E).contains(&b));

    if printable {
        out.push(b'(');
        for &byte in data {
            match byte {
                b'(' => out.extend_from_slice(b"\\("),
                b')' => out.extend_from_slice(b"\\)"),
                b'\\' => out.extend_from_slice(b"\\\\"),
                b'\n' => out.extend_from_slice(b"\\n"),
                b'\r' => out.extend_from_slice(b"\\r"),
                b'\t' => out.extend_from_slice(b"\\t"),
                _ => out.push(byte),
            }
        }
        out.push(b')');
    } else {
        out.push(b'<');
        for byte in data {
            out.extend_from_slice(format!("{:02X}", byte).as_bytes());
        }
        out.push(b'>');
    }
}

/// Names escape everything outside the regular printable range with `#xx`.
fn write_name(out: &mut Vec<u8>, name: &str) {
    out.push(b'/');
    for byte in name.bytes() {
        match byte {
            b'!'
            | b'"'
            | b'$'..=b'&'
            | b'\''
            | b'*'..=b'.'
            | b'0'..=b';'
            | b'='
            | b'?'
            | b'@'
            | b'A'..=b'Z'
            | b'^'..=b'z'
            | b'|'
            | b'~' => out.push(byte),
            _ => out.extend_from_slice(format!("#{:02X}", byte).as_bytes()),
        }
    }
}
