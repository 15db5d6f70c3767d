//! ASCII85Decode (base-85).
//!
//! Five characters in `!`..=`u` encode four bytes; `z` stands for four zero
//! bytes and `~>` ends the data. A final partial group of n characters yields
//! n-1 bytes.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};

/// ASCII85Decode filter implementation.
pub struct Ascii85Decoder;

impl StreamDecoder for Ascii85Decoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let body = input.strip_prefix(b"<~").unwrap_or(input);
        let mut output = Vec::with_capacity(body.len() * 4 / 5 + 4);
        let mut group = [0u8; 5];
        let mut count = 0;

        for &byte in body {
            match byte {
                b'~' => break,
                b'z' if count == 0 => output.extend_from_slice(&[0; 4]),
                b'z' => return Err(Error::Decode("ASCII85Decode: 'z' inside a group".to_string())),
                b'!'..=b'u' => {
                    group[count] = byte - b'!';
                    count += 1;
                    if count == 5 {
                        output.extend_from_slice(&group_value(&group)?.to_be_bytes());
                        count = 0;
                    }
                },
                b if crate::lexer::is_whitespace(b) => {},
                other => {
                    return Err(Error::Decode(format!("ASCII85Decode: invalid character 0x{:02X}", other)));
                },
            }
        }

        match count {
            0 => {},
            1 => return Err(Error::Decode("ASCII85Decode: dangling single character".to_string())),
            n => {
                group[n..].fill(84);
                let bytes = group_value(&group)?.to_be_bytes();
                output.extend_from_slice(&bytes[..n - 1]);
            },
        }
        Ok(output)
    }

    fn name(&self) -> &str {
        "ASCII85Decode"
    }
}

fn group_value(group: &[u8; 5]) -> Result<u32> {
    group
        .iter()
        .try_fold(0u32, |acc, &d| acc.checked_mul(85)?.checked_add(d as u32))
        .ok_or_else(|| Error::Decode("ASCII85Decode: group out of range".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text() {
        assert_eq!(Ascii85Decoder.decode(b"87cURD]j7BEbo7~>").unwrap(), b"Hello world");
    }

    #[test]
    fn test_z_shortcut_and_whitespace() {
        assert_eq!(Ascii85Decoder.decode(b"<~z\n87cURDZ~>").unwrap(), b"\0\0\0\0Hello");
    }

    #[test]
    fn test_invalid_character() {
        assert!(Ascii85Decoder.decode(b"87cU{").is_err());
    }

    #[test]
    fn test_overflow_group() {
        assert!(Ascii85Decoder.decode(b"uuuuu").is_err());
    }
}
