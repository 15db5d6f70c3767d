//! FlateDecode (zlib/deflate).
//!
//! Damaged zlib data is common in the wild, so decoding falls back through
//! progressively more forgiving strategies and keeps any partial output.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use libflate::zlib::Decoder as LibflateDecoder;
use std::io::Read;

/// FlateDecode filter implementation.
pub struct FlateDecoder;

impl StreamDecoder for FlateDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let zlib_err = match ZlibDecoder::new(input).read_to_end(&mut output) {
            Ok(_) => return Ok(output),
            Err(e) if !output.is_empty() => {
                log::warn!("FlateDecode recovered {} bytes before corruption: {}", output.len(), e);
                return Ok(output);
            },
            Err(e) => e,
        };

        // Raw deflate without the zlib wrapper
        output.clear();
        match DeflateDecoder::new(input).read_to_end(&mut output) {
            Ok(_) if !output.is_empty() => {
                log::info!("FlateDecode: raw deflate fallback produced {} bytes", output.len());
                return Ok(output);
            },
            Err(_) if !output.is_empty() => {
                log::warn!("FlateDecode: raw deflate partial recovery of {} bytes", output.len());
                return Ok(output);
            },
            _ => {},
        }

        // A second implementation with different tolerance for bad checksums
        output.clear();
        if let Ok(mut decoder) = LibflateDecoder::new(input) {
            match decoder.read_to_end(&mut output) {
                Ok(_) if !output.is_empty() => return Ok(output),
                Err(_) if !output.is_empty() => {
                    log::warn!("FlateDecode: libflate partial recovery of {} bytes", output.len());
                    return Ok(output);
                },
                _ => {},
            }
        }

        Err(Error::Decode(format!("FlateDecode failed: {}", zlib_err)))
    }

    fn name(&self) -> &str {
        "FlateDecode"
    }
}
