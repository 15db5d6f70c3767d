//! PDF lexer (tokenizer).
//!
//! Low-level tokenization of PDF byte streams. The same tokenizer serves the
//! file-level object parser and the content stream interpreter; words that are
//! not PDF object keywords come back as [`Token::Keyword`] so content streams
//! can treat them as operators.
//!
//! Whitespace (NUL, TAB, LF, FF, CR, SP) and comments (`%` to end of line) are
//! skipped before every token.

use nom::{
    IResult,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit1, one_of},
    combinator::opt,
    sequence::preceded,
};

/// Token types recognized by the PDF lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Integer number (e.g., 42, -123)
    Integer(i64),

    /// Real number (e.g., 3.14, -.002, 5.)
    Real(f64),

    /// Literal string body between the outer parentheses.
    /// Escape sequences are decoded by the parser.
    LiteralString(&'a [u8]),

    /// Hexadecimal string body between `<` and `>`, whitespace included
    HexString(&'a [u8]),

    /// Name without the leading `/`, `#XX` escapes decoded
    Name(String),

    /// `true`
    True,

    /// `false`
    False,

    /// `null`
    Null,

    /// `[`
    ArrayStart,

    /// `]`
    ArrayEnd,

    /// `<<`
    DictStart,

    /// `>>`
    DictEnd,

    /// `obj`
    ObjStart,

    /// `endobj`
    ObjEnd,

    /// `stream`
    StreamStart,

    /// `endstream`
    StreamEnd,

    /// `R` (the reference marker in `10 0 R`)
    R,

    /// Any other bare word, such as a content stream operator (`Tj`, `BT`, `'`)
    Keyword(&'a [u8]),
}

/// PDF whitespace characters.
#[inline]
pub fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

/// PDF delimiter characters.
#[inline]
pub fn is_delimiter(c: u8) -> bool {
    matches!(c, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

/// Characters that may appear in names, numbers and keywords.
#[inline]
pub fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

/// Skip all whitespace and comments.
pub fn skip_whitespace(input: &[u8]) -> &[u8] {
    let mut pos = 0;
    while pos < input.len() {
        let c = input[pos];
        if is_whitespace(c) {
            pos += 1;
        } else if c == b'%' {
            while pos < input.len() && input[pos] != b'\r' && input[pos] != b'\n' {
                pos += 1;
            }
        } else {
            break;
        }
    }
    &input[pos..]
}

fn fail<T>(input: &[u8], kind: nom::error::ErrorKind) -> IResult<&[u8], T> {
    Err(nom::Err::Error(nom::error::Error::new(input, kind)))
}

/// Parse an integer or real number.
///
/// Accepts a leading sign and reals with an empty integer or fractional part
/// (`.5`, `5.`, `-.002`). An integer too large for `i64` is read as a real.
fn parse_number(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let start = input;
    let (input, sign) = opt(one_of("+-"))(input)?;
    let (input, int_part) = opt(digit1)(input)?;
    let (input, frac_part) = opt(preceded(char('.'), opt(digit1)))(input)?;

    if int_part.is_none() && !matches!(frac_part, Some(Some(_))) {
        return fail(start, nom::error::ErrorKind::Digit);
    }
    // "12abc" is a keyword, not a number followed by garbage
    if input.first().is_some_and(|&c| is_regular(c) && c != b'+' && c != b'-') {
        return fail(start, nom::error::ErrorKind::Digit);
    }

    let negative = sign == Some('-');
    let int_digits = int_part.unwrap_or(b"0");

    if let Some(frac) = frac_part {
        let mut text = String::with_capacity(int_digits.len() + 8);
        if negative {
            text.push('-');
        }
        text.push_str(&String::from_utf8_lossy(int_digits));
        text.push('.');
        text.push_str(&String::from_utf8_lossy(frac.unwrap_or(b"0")));
        return match text.parse::<f64>() {
            Ok(n) => Ok((input, Token::Real(n))),
            Err(_) => fail(start, nom::error::ErrorKind::Float),
        };
    }

    let digits = String::from_utf8_lossy(int_digits);
    match digits.parse::<i64>() {
        Ok(n) => Ok((input, Token::Integer(if negative { -n } else { n }))),
        Err(_) => {
            let n: f64 = digits.parse().unwrap_or(0.0);
            Ok((input, Token::Real(if negative { -n } else { n })))
        },
    }
}

/// Parse a literal string enclosed in parentheses.
///
/// Balanced nested parentheses are part of the string; an escaped parenthesis
/// does not count towards the balance. The body is returned undecoded.
fn parse_literal_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (body, _) = char('(')(input)?;
    let mut depth = 1usize;
    let mut pos = 0;

    while pos < body.len() {
        match body[pos] {
            b'\\' => pos += 2,
            b'(' => {
                depth += 1;
                pos += 1;
            },
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&body[pos + 1..], Token::LiteralString(&body[..pos])));
                }
                pos += 1;
            },
            _ => pos += 1,
        }
    }

    fail(input, nom::error::ErrorKind::Char)
}

/// Parse a hexadecimal string enclosed in angle brackets.
fn parse_hex_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    if input.starts_with(b"<<") {
        return fail(input, nom::error::ErrorKind::Tag);
    }
    let (rest, _) = char('<')(input)?;
    let (rest, body) = take_while(|c: u8| c.is_ascii_hexdigit() || is_whitespace(c))(rest)?;
    let (rest, _) = char('>')(rest)?;
    Ok((rest, Token::HexString(body)))
}

/// Decode `#XX` escape sequences in a raw name.
///
/// Invalid sequences are kept literally. Decoded bytes that do not form UTF-8
/// are mapped through Latin-1 so no byte is lost.
///
/// ```
/// # use pdf_handler::lexer::decode_name_escapes;
/// assert_eq!(decode_name_escapes(b"A#20B#23C"), "A B#C");
/// assert_eq!(decode_name_escapes(b"Type"), "Type");
/// assert_eq!(decode_name_escapes(b"A#"), "A#");
/// ```
pub fn decode_name_escapes(raw: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' && i + 2 < raw.len() {
            let hex = &raw[i + 1..i + 3];
            if let Some(b) = std::str::from_utf8(hex)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
            {
                bytes.push(b);
                i += 3;
                continue;
            }
        }
        bytes.push(raw[i]);
        i += 1;
    }
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    }
}

/// Parse a name starting with `/`. An empty name (`/` followed by a delimiter) is allowed.
fn parse_name(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, _) = char('/')(input)?;
    let (rest, raw) = take_while(is_regular)(rest)?;
    Ok((rest, Token::Name(decode_name_escapes(raw))))
}

/// Parse `[ ] << >>`.
fn parse_delimiter(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    if let Ok((rest, _)) = tag::<_, _, nom::error::Error<&[u8]>>(b"<<")(input) {
        return Ok((rest, Token::DictStart));
    }
    if let Ok((rest, _)) = tag::<_, _, nom::error::Error<&[u8]>>(b">>")(input) {
        return Ok((rest, Token::DictEnd));
    }
    match input.first() {
        Some(b'[') => Ok((&input[1..], Token::ArrayStart)),
        Some(b']') => Ok((&input[1..], Token::ArrayEnd)),
        _ => fail(input, nom::error::ErrorKind::Tag),
    }
}

/// Parse a bare word. Object keywords are only recognized as whole words, so
/// `nullify` or `Rx` stay keywords of their own.
fn parse_word(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, word) = take_while(is_regular)(input)?;
    if word.is_empty() {
        return fail(input, nom::error::ErrorKind::Alpha);
    }
    let token = match word {
        b"true" => Token::True,
        b"false" => Token::False,
        b"null" => Token::Null,
        b"obj" => Token::ObjStart,
        b"endobj" => Token::ObjEnd,
        b"stream" => Token::StreamStart,
        b"endstream" => Token::StreamEnd,
        b"R" => Token::R,
        other => Token::Keyword(other),
    };
    Ok((rest, token))
}

/// Parse a single PDF token after skipping whitespace and comments.
pub fn token(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let input = skip_whitespace(input);
    match input.first() {
        None => fail(input, nom::error::ErrorKind::Eof),
        Some(b'/') => parse_name(input),
        Some(b'(') => parse_literal_string(input),
        Some(b'<') if input.get(1) != Some(&b'<') => parse_hex_string(input),
        Some(b'<' | b'>' | b'[' | b']') => parse_delimiter(input),
        Some(c) if c.is_ascii_digit() || matches!(c, b'+' | b'-' | b'.') => {
            parse_number(input).or_else(|_| parse_word(input))
        },
        Some(_) => parse_word(input),
    }
}

/// Tokenize the whole input, stopping at the first byte that does not start a token.
pub fn tokens(input: &[u8]) -> IResult<&[u8], Vec<Token<'_>>> {
    let mut out = Vec::new();
    let mut rest = input;
    while let Ok((next, tok)) = token(rest) {
        out.push(tok);
        rest = next;
    }
    Ok((skip_whitespace(rest), out))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Numbers
    // ========================================================================

    #[test]
    fn test_integers() {
        assert_eq!(token(b"42"), Ok((&b""[..], Token::Integer(42))));
        assert_eq!(token(b"-123"), Ok((&b""[..], Token::Integer(-123))));
        assert_eq!(token(b"+17 "), Ok((&b" "[..], Token::Integer(17))));
    }

    #[test]
    fn test_reals() {
        assert_eq!(token(b"-2.5"), Ok((&b""[..], Token::Real(-2.5))));
        assert_eq!(token(b".5"), Ok((&b""[..], Token::Real(0.5))));
        assert_eq!(token(b"5."), Ok((&b""[..], Token::Real(5.0))));
        assert_eq!(token(b"-.002"), Ok((&b""[..], Token::Real(-0.002))));
    }

    #[test]
    fn test_number_followed_by_delimiter() {
        assert_eq!(token(b"12]"), Ok((&b"]"[..], Token::Integer(12))));
        assert_eq!(token(b"0/Name"), Ok((&b"/Name"[..], Token::Integer(0))));
    }

    #[test]
    fn test_huge_integer_becomes_real() {
        let (_, tok) = token(b"99999999999999999999").unwrap();
        assert!(matches!(tok, Token::Real(n) if n > 9.0e18));
    }

    // ========================================================================
    // Strings
    // ========================================================================

    #[test]
    fn test_literal_string_nested() {
        assert_eq!(
            token(b"(Hello (World)) rest"),
            Ok((&b" rest"[..], Token::LiteralString(b"Hello (World)")))
        );
    }

    #[test]
    fn test_literal_string_escaped_paren() {
        assert_eq!(token(b"(a\\)b)"), Ok((&b""[..], Token::LiteralString(b"a\\)b"))));
    }

    #[test]
    fn test_unterminated_literal_string() {
        assert!(token(b"(never closed").is_err());
    }

    #[test]
    fn test_hex_string() {
        assert_eq!(token(b"<48 65>"), Ok((&b""[..], Token::HexString(b"48 65"))));
        assert_eq!(token(b"<>"), Ok((&b""[..], Token::HexString(b""))));
    }

    // ========================================================================
    // Names and keywords
    // ========================================================================

    #[test]
    fn test_names() {
        assert_eq!(token(b"/Type"), Ok((&b""[..], Token::Name("Type".to_string()))));
        assert_eq!(token(b"/A#20B/C"), Ok((&b"/C"[..], Token::Name("A B".to_string()))));
        assert_eq!(token(b"/ "), Ok((&b" "[..], Token::Name(String::new()))));
    }

    #[test]
    fn test_name_latin1_escape() {
        assert_eq!(decode_name_escapes(b"caf#E9"), "caf\u{e9}");
    }

    #[test]
    fn test_keywords_need_word_boundary() {
        assert_eq!(token(b"null"), Ok((&b""[..], Token::Null)));
        assert_eq!(token(b"nullify"), Ok((&b""[..], Token::Keyword(b"nullify"))));
        assert_eq!(token(b"endstream\n"), Ok((&b"\n"[..], Token::StreamEnd)));
        assert_eq!(token(b"R/X"), Ok((&b"/X"[..], Token::R)));
    }

    #[test]
    fn test_content_operators() {
        let (_, toks) = tokens(b"BT /F1 12 Tf (Hi) ' ET").unwrap();
        assert_eq!(toks, vec![
            Token::Keyword(b"BT"),
            Token::Name("F1".to_string()),
            Token::Integer(12),
            Token::Keyword(b"Tf"),
            Token::LiteralString(b"Hi"),
            Token::Keyword(b"'"),
            Token::Keyword(b"ET"),
        ]);
    }

    #[test]
    fn test_dictionary_tokens_with_comment() {
        let (rest, toks) = tokens(b"<< /Length 5 % comment\n >>").unwrap();
        assert!(rest.is_empty());
        assert_eq!(toks, vec![
            Token::DictStart,
            Token::Name("Length".to_string()),
            Token::Integer(5),
            Token::DictEnd,
        ]);
    }

    #[test]
    fn test_reference_tokens() {
        let (_, toks) = tokens(b"10 0 R").unwrap();
        assert_eq!(toks, vec![Token::Integer(10), Token::Integer(0), Token::R]);
    }

    #[test]
    fn test_skip_whitespace_all_kinds() {
        assert_eq!(skip_whitespace(b"\0\t\x0C\r\n %x\n42"), b"42");
    }
}
