//! Content stream parser.
//!
//! Content streams use postfix notation: operands come first, then the
//! operator keyword.
//!
//! ```text
//! BT
//!   /F1 12 Tf
//!   100 700 Td
//!   (Hello, World!) Tj
//! ET
//! ```
//!
//! Parsing is tolerant: a byte that starts no valid token is skipped together
//! with any operands collected so far.

use crate::content::operators::Operator;
use crate::lexer::{is_delimiter, is_regular, is_whitespace, skip_whitespace};
use crate::object::{Dictionary, PdfValue};
use crate::parser::ObjectParser;

/// Iterator over the operators of a decoded content stream.
#[derive(Debug)]
pub struct ContentOperators<'a> {
    input: &'a [u8],
}

impl<'a> ContentOperators<'a> {
    /// Start at the beginning of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { input: data }
    }

    /// Unparsed remainder.
    pub fn remaining(&self) -> &'a [u8] {
        self.input
    }
}

impl Iterator for ContentOperators<'_> {
    type Item = Operator;

    fn next(&mut self) -> Option<Operator> {
        let (rest, op) = next_operator(self.input)?;
        self.input = rest;
        Some(op)
    }
}

/// Parse a content stream into a sequence of operators.
///
/// ```
/// use pdf_handler::content::parse_content_stream;
///
/// let ops = parse_content_stream(b"BT /F1 12 Tf 100 700 Td (Hello) Tj ET");
/// assert_eq!(ops.len(), 5);
/// ```
pub fn parse_content_stream(data: &[u8]) -> Vec<Operator> {
    ContentOperators::new(data).collect()
}

/// Parse the next operator. Returns `None` at the end of the stream.
pub fn next_operator(mut input: &[u8]) -> Option<(&[u8], Operator)> {
    let parser = ObjectParser::default();
    let mut operands = Vec::new();

    loop {
        input = skip_whitespace(input);
        let &first = input.first()?;

        if is_regular(first) && !first.is_ascii_digit() && !matches!(first, b'+' | b'-' | b'.') {
            let len = input.iter().take_while(|&&b| is_regular(b)).count();
            let (word, rest) = input.split_at(len);
            match word {
                b"true" => operands.push(PdfValue::Boolean(true)),
                b"false" => operands.push(PdfValue::Boolean(false)),
                b"null" => operands.push(PdfValue::Null),
                b"BI" => return Some(inline_image(rest)),
                _ => {
                    let name = String::from_utf8_lossy(word);
                    return Some((rest, Operator::from_parts(&name, operands)));
                },
            }
            input = rest;
            continue;
        }

        match parser.parse(input) {
            Ok((rest, value)) => {
                operands.push(value);
                input = rest;
            },
            Err(_) => {
                log::debug!("Skipping unparseable byte 0x{:02X} in content stream", first);
                operands.clear();
                input = &input[1..];
            },
        }
    }
}

/// Parse `<key> <value> ... ID <data> EI` after `BI`.
fn inline_image(mut input: &[u8]) -> (&[u8], Operator) {
    let parser = ObjectParser::default();
    let mut dict = Dictionary::new();

    loop {
        input = skip_whitespace(input);
        if input.starts_with(b"ID") && input.get(2).map_or(true, |&c| is_whitespace(c)) {
            input = &input[2..];
            break;
        }
        let entry = parser
            .parse(input)
            .and_then(|(rest, key)| parser.parse(rest).map(|(rest, value)| (rest, key, value)));
        match entry {
            Ok((rest, PdfValue::Name(key), value)) => {
                dict.insert(key, value);
                input = rest;
            },
            _ => {
                log::warn!("Unreadable inline image dictionary; skipping the rest of the stream");
                return (&input[input.len()..], Operator::InlineImage { dict, data: Vec::new() });
            },
        }
    }

    // one whitespace byte separates ID from the data
    if input.first().is_some_and(|&c| is_whitespace(c)) {
        input = &input[1..];
    }
    match find_ei(input) {
        Some(pos) => {
            let data = input[..pos].to_vec();
            (&input[pos + 3..], Operator::InlineImage { dict, data })
        },
        None => {
            log::warn!("Inline image without EI");
            (
                &input[input.len()..],
                Operator::InlineImage {
                    dict,
                    data: input.to_vec(),
                },
            )
        },
    }
}

/// Position of the whitespace byte before an `EI` that is followed by
/// whitespace, a delimiter or the end of the stream.
fn find_ei(input: &[u8]) -> Option<usize> {
    (0..input.len().saturating_sub(2)).find(|&i| {
        is_whitespace(input[i])
            && &input[i + 1..i + 3] == b"EI"
            && input
                .get(i + 3)
                .map_or(true, |&c| is_whitespace(c) || is_delimiter(c))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::operators::TextElement;

    #[test]
    fn test_parse_simple_text() {
        let ops = parse_content_stream(b"BT /F1 12 Tf 100 700 Td (Hello) Tj ET");
        assert_eq!(ops[0], Operator::BeginText);
        assert_eq!(
            ops[1],
            Operator::Tf {
                font: "F1".to_string(),
                size: 12.0
            }
        );
        assert_eq!(ops[3], Operator::Tj { text: b"Hello".to_vec() });
        assert_eq!(ops[4], Operator::EndText);
    }

    #[test]
    fn test_quote_operators() {
        let ops = parse_content_stream(b"(a) ' 1 2 (b) \" T*");
        assert_eq!(ops[0], Operator::Quote { text: b"a".to_vec() });
        assert_eq!(
            ops[1],
            Operator::DoubleQuote {
                word_space: 1.0,
                char_space: 2.0,
                text: b"b".to_vec()
            }
        );
        assert_eq!(ops[2], Operator::TStar);
    }

    #[test]
    fn test_tj_array_and_hex() {
        let ops = parse_content_stream(b"[(A) -120 <42>] TJ");
        assert_eq!(
            ops,
            vec![Operator::TJ {
                array: vec![
                    TextElement::String(b"A".to_vec()),
                    TextElement::Offset(-120.0),
                    TextElement::String(b"B".to_vec()),
                ]
            }]
        );
    }

    #[test]
    fn test_colors_are_not_references() {
        let ops = parse_content_stream(b"1 0 0 RG 0 0 1 rg");
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], Operator::Other { name, operands } if name == "RG" && operands.len() == 3));
    }

    #[test]
    fn test_inline_image_skipped() {
        let ops = parse_content_stream(b"q BI /W 2 /H 1 /BPC 8 /CS /G ID \x00EI\xff EI Q (x) Tj");
        assert_eq!(ops[0], Operator::SaveState);
        match &ops[1] {
            Operator::InlineImage { dict, data } => {
                assert_eq!(dict.get("W"), Some(&PdfValue::Integer(2)));
                assert_eq!(data, b"\x00EI\xff");
            },
            other => panic!("expected InlineImage, got {:?}", other),
        }
        assert_eq!(ops[2], Operator::RestoreState);
        assert_eq!(ops[3], Operator::Tj { text: b"x".to_vec() });
    }

    #[test]
    fn test_garbage_is_skipped() {
        let ops = parse_content_stream(b"BT ) } (ok) Tj ET");
        assert_eq!(ops, vec![
            Operator::BeginText,
            Operator::Tj { text: b"ok".to_vec() },
            Operator::EndText
        ]);
    }

    #[test]
    fn test_comments_and_empty() {
        assert!(parse_content_stream(b"").is_empty());
        assert!(parse_content_stream(b"  % only a comment\n").is_empty());
    }
}
