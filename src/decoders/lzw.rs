//! LZWDecode.
//!
//! PDF's LZW uses MSB-first codes starting at 9 bits, clear code 256 and EOD
//! 257. With `/EarlyChange 1` (the default) the code width grows one code
//! early, which is what TIFF does; `/EarlyChange 0` behaves like GIF.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};
use crate::object::Dictionary;
use weezl::{BitOrder, decode::Decoder};

/// LZWDecode filter implementation.
pub struct LzwDecoder {
    early_change: bool,
}

impl Default for LzwDecoder {
    fn default() -> Self {
        Self { early_change: true }
    }
}

impl LzwDecoder {
    /// Decoder honouring `/EarlyChange` from the filter's decode parameters.
    pub fn from_params(params: Option<&Dictionary>) -> Self {
        let early_change = params
            .and_then(|p| p.get("EarlyChange"))
            .and_then(|v| v.as_integer())
            .map_or(true, |v| v != 0);
        Self { early_change }
    }
}

impl StreamDecoder for LzwDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = if self.early_change {
            Decoder::with_tiff_size_switch(BitOrder::Msb, 8)
        } else {
            Decoder::new(BitOrder::Msb, 8)
        };

        let mut output = Vec::new();
        let result = decoder.into_stream(&mut output).decode_all(input);
        match result.status {
            Ok(_) => Ok(output),
            Err(e) if !output.is_empty() => {
                log::warn!("LZWDecode recovered {} bytes before error: {:?}", output.len(), e);
                Ok(output)
            },
            Err(e) => Err(Error::Decode(format!("LZWDecode failed: {:?}", e))),
        }
    }

    fn name(&self) -> &str {
        "LZWDecode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::PdfValue;

    fn encode(data: &[u8], early: bool) -> Vec<u8> {
        let mut encoder = if early {
            weezl::encode::Encoder::with_tiff_size_switch(BitOrder::Msb, 8)
        } else {
            weezl::encode::Encoder::new(BitOrder::Msb, 8)
        };
        encoder.encode(data).unwrap()
    }

    #[test]
    fn test_early_change_default() {
        let text = b"-----A---B-----A---B-----A---B".repeat(40);
        let compressed = encode(&text, true);
        assert_eq!(LzwDecoder::default().decode(&compressed).unwrap(), text);
    }

    #[test]
    fn test_early_change_zero() {
        let text = b"abcabcabcabcabcabcabcabc".repeat(60);
        let compressed = encode(&text, false);
        let mut params = Dictionary::new();
        params.insert("EarlyChange".to_string(), PdfValue::Integer(0));
        assert_eq!(LzwDecoder::from_params(Some(&params)).decode(&compressed).unwrap(), text);
    }

    #[test]
    fn test_invalid_input_fails() {
        assert!(LzwDecoder::default().decode(&[0xFF, 0xFF, 0xFF, 0xFF]).is_err());
    }
}
