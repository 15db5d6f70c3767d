//! RunLengthDecode.
//!
//! Length byte 0-127 copies the next n+1 bytes, 129-255 repeats the next byte
//! 257-n times and 128 ends the data.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};

/// RunLengthDecode filter implementation.
pub struct RunLengthDecoder;

impl StreamDecoder for RunLengthDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut i = 0;

        while let Some(&length) = input.get(i) {
            i += 1;
            match length {
                0..=127 => {
                    let count = length as usize + 1;
                    let run = input.get(i..i + count).ok_or_else(|| {
                        Error::Decode(format!("RunLengthDecode: literal run of {} bytes is truncated", count))
                    })?;
                    output.extend_from_slice(run);
                    i += count;
                },
                128 => break,
                _ => {
                    let byte = *input
                        .get(i)
                        .ok_or_else(|| Error::Decode("RunLengthDecode: missing byte for run".to_string()))?;
                    output.resize(output.len() + 257 - length as usize, byte);
                    i += 1;
                },
            }
        }

        Ok(output)
    }

    fn name(&self) -> &str {
        "RunLengthDecode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_and_repeat() {
        let input = [2, b'a', b'b', b'c', 253, b'x', 128, 0, b'z'];
        assert_eq!(RunLengthDecoder.decode(&input).unwrap(), b"abcxxxx");
    }

    #[test]
    fn test_truncated_literal() {
        assert!(RunLengthDecoder.decode(&[5, b'a']).is_err());
    }
}
