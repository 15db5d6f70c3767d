//! Predictor post-processing for Flate and LZW data.
//!
//! `/Predictor 2` is TIFF horizontal differencing; 10-15 are PNG filters, where
//! every row starts with a tag byte naming the filter used for that row.

use crate::error::{Error, Result};
use crate::object::Dictionary;

/// Predictor parameters from a `/DecodeParms` dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeParams {
    /// Predictor algorithm (1 = none, 2 = TIFF, 10-15 = PNG)
    pub predictor: i64,
    /// Samples per row
    pub columns: usize,
    /// Color components per sample
    pub colors: usize,
    /// Bits per component
    pub bits_per_component: usize,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            columns: 1,
            colors: 1,
            bits_per_component: 8,
        }
    }
}

impl DecodeParams {
    /// Read `/Predictor`, `/Columns`, `/Colors` and `/BitsPerComponent`.
    pub fn from_dict(dict: &Dictionary) -> Self {
        let get = |key: &str, default: i64| dict.get(key).and_then(|v| v.as_integer()).unwrap_or(default);
        Self {
            predictor: get("Predictor", 1),
            columns: get("Columns", 1).max(1) as usize,
            colors: get("Colors", 1).clamp(1, 32) as usize,
            bits_per_component: get("BitsPerComponent", 8).clamp(1, 16) as usize,
        }
    }

    /// Bytes of sample data per row.
    pub fn row_bytes(&self) -> usize {
        (self.columns * self.colors * self.bits_per_component).div_ceil(8)
    }

    /// Bytes per whole pixel, at least one.
    pub fn pixel_bytes(&self) -> usize {
        ((self.colors * self.bits_per_component) / 8).max(1)
    }
}

/// Reverse the predictor described by `params`.
pub fn decode_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    match params.predictor {
        1 => Ok(data.to_vec()),
        2 => decode_tiff(data, params),
        10..=15 => decode_png(data, params),
        other => Err(Error::Decode(format!("unsupported predictor {}", other))),
    }
}

fn decode_tiff(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    if params.bits_per_component != 8 {
        log::warn!(
            "TIFF predictor with {} bits per component left undecoded",
            params.bits_per_component
        );
        return Ok(data.to_vec());
    }
    let row = params.row_bytes();
    let bpp = params.colors;
    let mut output = data.to_vec();
    for line in output.chunks_mut(row) {
        for i in bpp..line.len() {
            line[i] = line[i].wrapping_add(line[i - bpp]);
        }
    }
    Ok(output)
}

fn decode_png(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    let row = params.row_bytes();
    let bpp = params.pixel_bytes();
    let mut output = Vec::with_capacity(data.len());
    let mut prev = vec![0u8; row];

    for chunk in data.chunks(row + 1) {
        let (tag, encoded) = chunk
            .split_first()
            .ok_or_else(|| Error::Decode("empty predictor row".to_string()))?;
        let mut line = encoded.to_vec();

        for i in 0..line.len() {
            let left = if i >= bpp { line[i - bpp] } else { 0 };
            let up = prev[i];
            let up_left = if i >= bpp { prev[i - bpp] } else { 0 };
            let predicted = match tag {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((left as u16 + up as u16) / 2) as u8,
                4 => paeth(left, up, up_left),
                other => return Err(Error::Decode(format!("invalid PNG predictor tag {}", other))),
            };
            line[i] = line[i].wrapping_add(predicted);
        }

        prev[..line.len()].copy_from_slice(&line);
        output.extend_from_slice(&line);
    }

    Ok(output)
}

/// Paeth predictor function from the PNG specification.
fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}
