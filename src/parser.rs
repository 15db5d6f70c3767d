//! PDF object parser.
//!
//! Combines lexer tokens into [`PdfValue`]s using recursive descent:
//! primitives map directly, `[` and `<<` recurse, and an integer is promoted to
//! a reference when followed by `<int> R`. A dictionary followed by `stream`
//! becomes a stream whose payload is sliced using `/Length`.
//!
//! Indirect `/Length` values need the object table, so [`ObjectParser`] takes an
//! optional resolver callback supplied by the document.

use crate::error::{Error, Result};
use crate::lexer::{Token, token};
use crate::object::{Dictionary, ObjectRef, PdfValue};
use crate::parser_config::ParserOptions;
use nom::IResult;

/// Callback resolving an indirect `/Length` to a byte count.
pub type LengthResolver<'r> = &'r dyn Fn(ObjectRef) -> Option<usize>;

/// Decode escape sequences in PDF literal strings.
///
/// ISO 32000-1:2008, Section 7.3.4.2: `\n \r \t \b \f \( \) \\`, octal `\ddd`
/// (one to three digits) and line continuation (`\` before EOL). A backslash
/// before any other character is dropped.
///
/// ```
/// # use pdf_handler::parser::decode_literal_string;
/// assert_eq!(decode_literal_string(b"Section \\247 71.01"), b"Section \xa7 71.01");
/// ```
pub fn decode_literal_string(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        let c = raw[i];
        if c != b'\\' {
            // A bare EOL inside a literal string reads as a single LF
            if c == b'\r' {
                out.push(b'\n');
                i += if raw.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
            } else {
                out.push(c);
                i += 1;
            }
            continue;
        }

        let Some(&next) = raw.get(i + 1) else {
            break;
        };
        i += 2;
        match next {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'(' | b')' | b'\\' => out.push(next),
            b'\n' => {},
            b'\r' => {
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            },
            b'0'..=b'7' => {
                let mut value = (next - b'0') as u32;
                for _ in 0..2 {
                    match raw.get(i) {
                        Some(&d @ b'0'..=b'7') => {
                            value = value * 8 + (d - b'0') as u32;
                            i += 1;
                        },
                        _ => break,
                    }
                }
                out.push((value & 0xFF) as u8);
            },
            other => out.push(other),
        }
    }

    out
}

/// Decode a hex string body. Whitespace is ignored and an odd trailing digit
/// is padded with 0.
///
/// ```
/// use pdf_handler::parser::decode_hex;
/// assert_eq!(decode_hex(b"48 65 6C 6C 6F").unwrap(), b"Hello");
/// assert_eq!(decode_hex(b"901FA").unwrap(), vec![0x90, 0x1F, 0xA0]);
/// ```
pub fn decode_hex(hex_bytes: &[u8]) -> Result<Vec<u8>> {
    fn nibble(c: u8) -> Option<u8> {
        match c {
            b'0'..=b'9' => Some(c - b'0'),
            b'a'..=b'f' => Some(c - b'a' + 10),
            b'A'..=b'F' => Some(c - b'A' + 10),
            _ => None,
        }
    }

    let mut out = Vec::with_capacity(hex_bytes.len() / 2 + 1);
    let mut high: Option<u8> = None;
    for (offset, &c) in hex_bytes.iter().enumerate() {
        if crate::lexer::is_whitespace(c) {
            continue;
        }
        let n = nibble(c).ok_or_else(|| Error::ParseError {
            offset,
            reason: format!("invalid hex digit 0x{:02X}", c),
        })?;
        match high.take() {
            Some(h) => out.push((h << 4) | n),
            None => high = Some(n),
        }
    }
    if let Some(h) = high {
        out.push(h << 4);
    }
    Ok(out)
}

/// Object parser carrying limits and the `/Length` resolver.
pub struct ObjectParser<'r> {
    max_nesting: usize,
    strict: bool,
    allow_malformed_streams: bool,
    resolve_length: Option<LengthResolver<'r>>,
}

impl Default for ObjectParser<'_> {
    fn default() -> Self {
        Self::new(&ParserOptions::default())
    }
}

impl<'r> ObjectParser<'r> {
    /// Parser using the limits of `options`.
    pub fn new(options: &ParserOptions) -> Self {
        Self {
            max_nesting: options.max_nesting,
            strict: options.strict,
            allow_malformed_streams: options.allow_malformed_streams,
            resolve_length: None,
        }
    }

    /// Attach a resolver for indirect stream lengths.
    pub fn with_length_resolver(mut self, resolver: LengthResolver<'r>) -> Self {
        self.resolve_length = Some(resolver);
        self
    }

    /// Parse one object.
    pub fn parse<'a>(&self, input: &'a [u8]) -> IResult<&'a [u8], PdfValue> {
        self.value(input, 0)
    }

    fn value<'a>(&self, input: &'a [u8], depth: usize) -> IResult<&'a [u8], PdfValue> {
        let (rest, tok) = token(input)?;

        match tok {
            Token::Null => Ok((rest, PdfValue::Null)),
            Token::True => Ok((rest, PdfValue::Boolean(true))),
            Token::False => Ok((rest, PdfValue::Boolean(false))),
            Token::Integer(i) => {
                if let Some((after, r)) = reference_tail(i, rest) {
                    return Ok((after, PdfValue::Reference(r)));
                }
                Ok((rest, PdfValue::Integer(i)))
            },
            Token::Real(r) => Ok((rest, PdfValue::Real(r))),
            Token::LiteralString(raw) => Ok((rest, PdfValue::String(decode_literal_string(raw)))),
            Token::HexString(raw) => match decode_hex(raw) {
                Ok(bytes) => Ok((rest, PdfValue::String(bytes))),
                Err(_) => Err(nom::Err::Failure(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::HexDigit,
                ))),
            },
            Token::Name(name) => Ok((rest, PdfValue::Name(name))),
            Token::ArrayStart => {
                self.check_depth(input, depth)?;
                self.array(rest, depth + 1)
            },
            Token::DictStart => {
                self.check_depth(input, depth)?;
                let (after_dict, dict) = self.dictionary(rest, depth + 1)?;
                match token(after_dict) {
                    Ok((after_kw, Token::StreamStart)) => {
                        let (after_stream, data) = self.stream_data(after_kw, &dict)?;
                        Ok((after_stream, PdfValue::stream(dict, data)))
                    },
                    _ => Ok((after_dict, PdfValue::Dictionary(dict))),
                }
            },
            _ => Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag))),
        }
    }

    fn check_depth<'a>(&self, input: &'a [u8], depth: usize) -> std::result::Result<(), nom::Err<nom::error::Error<&'a [u8]>>> {
        if depth >= self.max_nesting {
            log::warn!("Object nesting exceeds {} levels", self.max_nesting);
            return Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::TooLarge,
            )));
        }
        Ok(())
    }

    /// `[ obj1 obj2 ... ]`. An array cut off by end of input keeps its elements.
    fn array<'a>(&self, input: &'a [u8], depth: usize) -> IResult<&'a [u8], PdfValue> {
        let mut items = Vec::new();
        let mut remaining = input;

        loop {
            match token(remaining) {
                Ok((rest, Token::ArrayEnd)) => return Ok((rest, PdfValue::Array(items))),
                Ok(_) => {
                    let (rest, item) = self.value(remaining, depth)?;
                    items.push(item);
                    remaining = rest;
                },
                Err(nom::Err::Error(_)) if !self.strict && crate::lexer::skip_whitespace(remaining).is_empty() => {
                    log::warn!("Unterminated array at end of input");
                    return Ok((remaining, PdfValue::Array(items)));
                },
                Err(e) => return Err(e),
            }
        }
    }

    /// `<< /Key value ... >>`. Later duplicate keys replace earlier ones.
    fn dictionary<'a>(&self, input: &'a [u8], depth: usize) -> IResult<&'a [u8], Dictionary> {
        let mut dict = Dictionary::new();
        let mut remaining = input;

        loop {
            match token(remaining) {
                Ok((rest, Token::DictEnd)) => return Ok((rest, dict)),
                Ok((rest, Token::Name(key))) => {
                    let (rest, value) = self.value(rest, depth)?;
                    dict.insert(key, value);
                    remaining = rest;
                },
                Ok(_) => {
                    return Err(nom::Err::Error(nom::error::Error::new(
                        remaining,
                        nom::error::ErrorKind::Tag,
                    )));
                },
                Err(nom::Err::Error(_)) if !self.strict && crate::lexer::skip_whitespace(remaining).is_empty() => {
                    log::warn!("Unterminated dictionary at end of input");
                    return Ok((remaining, dict));
                },
                Err(e) => return Err(e),
            }
        }
    }

    fn declared_length(&self, dict: &Dictionary) -> Option<usize> {
        match dict.get("Length")? {
            PdfValue::Integer(n) if *n >= 0 => Some(*n as usize),
            PdfValue::Reference(r) => self.resolve_length.and_then(|f| f(*r)),
            _ => None,
        }
    }

    /// Payload after the `stream` keyword.
    ///
    /// ISO 32000-1:2008, Section 7.3.8.1: the keyword is followed by CRLF or LF.
    /// The declared `/Length` is used when `endstream` follows the declared span;
    /// otherwise the payload runs up to the next `endstream`.
    fn stream_data<'a>(&self, input: &'a [u8], dict: &Dictionary) -> IResult<&'a [u8], Vec<u8>> {
        let body = if input.starts_with(b"\r\n") {
            &input[2..]
        } else if input.starts_with(b"\n") || input.starts_with(b"\r") {
            &input[1..]
        } else {
            input
        };

        if let Some(length) = self.declared_length(dict) {
            if length <= body.len() {
                if let Ok((rest, Token::StreamEnd)) = token(&body[length..]) {
                    return Ok((rest, body[..length].to_vec()));
                }
            }
            if !self.allow_malformed_streams {
                return Err(nom::Err::Failure(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::LengthValue,
                )));
            }
            log::warn!("Stream /Length {} does not reach endstream; scanning for endstream", length);
        } else if !self.allow_malformed_streams {
            return Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::LengthValue,
            )));
        } else {
            log::debug!("Stream without usable /Length; scanning for endstream");
        }

        let Some(pos) = find_keyword(body, b"endstream") else {
            return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Eof)));
        };
        let mut end = pos;
        if end > 0 && body[end - 1] == b'\n' {
            end -= 1;
        }
        if end > 0 && body[end - 1] == b'\r' {
            end -= 1;
        }
        Ok((&body[pos + b"endstream".len()..], body[..end].to_vec()))
    }

    /// Parse `N G obj <value> endobj` and return the reference and value.
    ///
    /// A missing `endobj` is tolerated outside strict mode.
    pub fn indirect_object<'a>(&self, input: &'a [u8]) -> IResult<&'a [u8], (ObjectRef, PdfValue)> {
        let (rest, id) = match token(input)? {
            (rest, Token::Integer(n)) if n >= 0 && n <= u32::MAX as i64 => (rest, n as u32),
            _ => return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit))),
        };
        let (rest, gen) = match token(rest)? {
            (rest, Token::Integer(n)) if (0..=u16::MAX as i64).contains(&n) => (rest, n as u16),
            _ => return Err(nom::Err::Error(nom::error::Error::new(rest, nom::error::ErrorKind::Digit))),
        };
        let (rest, _) = match token(rest)? {
            (rest, Token::ObjStart) => (rest, ()),
            _ => return Err(nom::Err::Error(nom::error::Error::new(rest, nom::error::ErrorKind::Tag))),
        };
        let (rest, value) = self.parse(rest)?;
        match token(rest) {
            Ok((after, Token::ObjEnd)) => Ok((after, (ObjectRef::new(id, gen), value))),
            _ if !self.strict => {
                log::debug!("Object {} {} has no endobj", id, gen);
                Ok((rest, (ObjectRef::new(id, gen), value)))
            },
            _ => Err(nom::Err::Error(nom::error::Error::new(rest, nom::error::ErrorKind::Tag))),
        }
    }
}

/// Check for `<gen> R` after an integer that could be an object number.
fn reference_tail(id: i64, input: &[u8]) -> Option<(&[u8], ObjectRef)> {
    if id < 0 || id > u32::MAX as i64 {
        return None;
    }
    let (rest, gen) = match token(input).ok()? {
        (rest, Token::Integer(g)) if (0..=u16::MAX as i64).contains(&g) => (rest, g as u16),
        _ => return None,
    };
    match token(rest).ok()? {
        (rest, Token::R) => Some((rest, ObjectRef::new(id as u32, gen))),
        _ => None,
    }
}

/// Find a keyword at a token boundary.
pub(crate) fn find_keyword(haystack: &[u8], keyword: &[u8]) -> Option<usize> {
    haystack.windows(keyword.len()).position(|w| w == keyword)
}

/// Parse one PDF object with default options.
///
/// ```
/// use pdf_handler::parser::parse_object;
///
/// let (_, obj) = parse_object(b"<< /Type /Page /Count 3 >>").unwrap();
/// assert_eq!(obj.dict_type(), Some("Page"));
/// ```
pub fn parse_object(input: &[u8]) -> IResult<&[u8], PdfValue> {
    ObjectParser::default().parse(input)
}

/// Byte offset of a nom error relative to `base`.
pub(crate) fn error_offset(base: &[u8], err: &nom::Err<nom::error::Error<&[u8]>>) -> usize {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => base.len().saturating_sub(e.input.len()),
        nom::Err::Incomplete(_) => base.len(),
    }
}

/// Convert a nom failure at `base + offset` into a [`Error::ParseError`].
pub(crate) fn to_parse_error(
    base: &[u8],
    start: usize,
    err: nom::Err<nom::error::Error<&[u8]>>,
) -> Error {
    let reason = match &err {
        nom::Err::Error(e) | nom::Err::Failure(e) => format!("{:?}", e.code),
        nom::Err::Incomplete(_) => "unexpected end of input".to_string(),
    };
    Error::ParseError {
        offset: start + error_offset(base, &err),
        reason,
    }
}
