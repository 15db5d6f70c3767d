//! ASCIIHexDecode.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};

/// ASCIIHexDecode filter implementation.
///
/// Whitespace is ignored, `>` ends the data and an odd final digit is
/// padded with 0.
pub struct AsciiHexDecoder;

impl StreamDecoder for AsciiHexDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let end = input.iter().position(|&b| b == b'>').unwrap_or(input.len());
        crate::parser::decode_hex(&input[..end])
            .map_err(|e| Error::Decode(format!("ASCIIHexDecode: {}", e)))
    }

    fn name(&self) -> &str {
        "ASCIIHexDecode"
    }
}
