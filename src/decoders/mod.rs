//! Stream filters.
//!
//! Each supported `/Filter` has a [`StreamDecoder`]; a stream's filters are
//! applied in order and each filter's `/DecodeParms` predictor runs right
//! after it. Image codecs (DCT, JPX, CCITT fax, JBIG2) are not decoded: the
//! chain stops there and the bytes come back as they are.

use crate::error::{Error, Result};
use crate::object::{Dictionary, PdfValue};
use crate::parser_config::ParserOptions;

mod ascii85;
mod ascii_hex;
mod flate;
mod lzw;
mod predictor;
mod runlength;

pub use ascii85::Ascii85Decoder;
pub use ascii_hex::AsciiHexDecoder;
pub use flate::FlateDecoder;
pub use lzw::LzwDecoder;
pub use predictor::{DecodeParams, decode_predictor};
pub use runlength::RunLengthDecoder;

/// Outputs smaller than this are never rejected for their ratio alone.
const RATIO_CHECK_FLOOR: usize = 1024 * 1024;

/// PDF stream filter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// FlateDecode (`Fl`)
    FlateDecode,
    /// LZWDecode (`LZW`)
    LZWDecode,
    /// ASCII85Decode (`A85`)
    ASCII85Decode,
    /// ASCIIHexDecode (`AHx`)
    ASCIIHexDecode,
    /// RunLengthDecode (`RL`)
    RunLengthDecode,
    /// DCTDecode (`DCT`), JPEG
    DCTDecode,
    /// JPXDecode, JPEG 2000
    JPXDecode,
    /// CCITTFaxDecode (`CCF`)
    CCITTFaxDecode,
    /// JBIG2Decode
    JBIG2Decode,
}

impl Filter {
    /// Look up a filter by its full or abbreviated name.
    pub fn from_name(name: &str) -> Result<Self> {
        Ok(match name {
            "FlateDecode" | "Fl" => Filter::FlateDecode,
            "LZWDecode" | "LZW" => Filter::LZWDecode,
            "ASCII85Decode" | "A85" => Filter::ASCII85Decode,
            "ASCIIHexDecode" | "AHx" => Filter::ASCIIHexDecode,
            "RunLengthDecode" | "RL" => Filter::RunLengthDecode,
            "DCTDecode" | "DCT" => Filter::DCTDecode,
            "JPXDecode" => Filter::JPXDecode,
            "CCITTFaxDecode" | "CCF" => Filter::CCITTFaxDecode,
            "JBIG2Decode" => Filter::JBIG2Decode,
            other => return Err(Error::UnsupportedFilter(other.to_string())),
        })
    }

    /// Image codecs whose output is left encoded.
    pub fn is_opaque(&self) -> bool {
        matches!(
            self,
            Filter::DCTDecode | Filter::JPXDecode | Filter::CCITTFaxDecode | Filter::JBIG2Decode
        )
    }
}

/// Trait for PDF stream decoders.
pub trait StreamDecoder {
    /// Decode the input data.
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// Name of the filter (e.g., "FlateDecode").
    fn name(&self) -> &str;
}

/// The `/Filter` chain of a stream dictionary paired with each filter's
/// `/DecodeParms` dictionary.
pub fn filter_chain(dict: &Dictionary) -> Result<Vec<(Filter, Option<Dictionary>)>> {
    let names: Vec<&str> = match dict.get("Filter") {
        None | Some(PdfValue::Null) => return Ok(Vec::new()),
        Some(PdfValue::Name(n)) => vec![n.as_str()],
        Some(PdfValue::Array(arr)) => arr.iter().filter_map(|v| v.as_name()).collect(),
        Some(other) => return Err(other.type_error("Name or Array")),
    };
    let params: Vec<Option<Dictionary>> = match dict.get("DecodeParms").or_else(|| dict.get("DP")) {
        Some(PdfValue::Dictionary(d)) => vec![Some(d.clone())],
        Some(PdfValue::Array(arr)) => arr.iter().map(|v| v.as_dict().cloned()).collect(),
        _ => Vec::new(),
    };

    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| Ok((Filter::from_name(name)?, params.get(i).cloned().flatten())))
        .collect()
}

/// Decode a stream's payload with default limits.
pub fn decode_stream(stream: &PdfValue) -> Result<Vec<u8>> {
    decode_stream_with_options(stream, &ParserOptions::default())
}

/// Decode a stream's payload through its `/Filter` chain.
///
/// Fails with [`Error::UnsupportedFilter`] for filters outside the supported
/// set and with [`Error::Decode`] when the limits in `options` are exceeded.
pub fn decode_stream_with_options(stream: &PdfValue, options: &ParserOptions) -> Result<Vec<u8>> {
    match stream {
        PdfValue::Stream { dict, data } => decode_data(data, dict, options),
        other => Err(other.type_error("Stream")),
    }
}

/// Decode raw bytes using the filters named in `dict`.
pub fn decode_data(data: &[u8], dict: &Dictionary, options: &ParserOptions) -> Result<Vec<u8>> {
    let chain = filter_chain(dict)?;
    let mut current = data.to_vec();

    for (filter, params) in chain {
        if filter.is_opaque() {
            log::debug!("{:?} left encoded", filter);
            break;
        }
        current = match filter {
            Filter::FlateDecode => FlateDecoder.decode(&current)?,
            Filter::LZWDecode => LzwDecoder::from_params(params.as_ref()).decode(&current)?,
            Filter::ASCII85Decode => Ascii85Decoder.decode(&current)?,
            Filter::ASCIIHexDecode => AsciiHexDecoder.decode(&current)?,
            Filter::RunLengthDecode => RunLengthDecoder.decode(&current)?,
            _ => current,
        };
        check_limits(data.len(), current.len(), options)?;

        if matches!(filter, Filter::FlateDecode | Filter::LZWDecode) {
            if let Some(params) = params.as_ref().map(DecodeParams::from_dict) {
                current = decode_predictor(&current, &params)?;
            }
        }
    }

    Ok(current)
}

fn check_limits(compressed: usize, decoded: usize, options: &ParserOptions) -> Result<()> {
    if options.max_decompressed_size > 0 && decoded > options.max_decompressed_size {
        return Err(Error::Decode(format!(
            "decompressed size {} bytes exceeds limit {} bytes",
            decoded, options.max_decompressed_size
        )));
    }
    if options.max_decompression_ratio > 0 && decoded > RATIO_CHECK_FLOOR {
        let ratio = decoded / compressed.max(1);
        if ratio > options.max_decompression_ratio as usize {
            return Err(Error::Decode(format!(
                "decompression ratio {}:1 exceeds limit {}:1",
                ratio, options.max_decompression_ratio
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_with(filter: PdfValue, data: &[u8]) -> PdfValue {
        let mut dict = Dictionary::new();
        dict.insert("Filter".to_string(), filter);
        PdfValue::stream(dict, data.to_vec())
    }

    #[test]
    fn test_no_filter() {
        let stream = PdfValue::stream(Dictionary::new(), b"Hello, World!".to_vec());
        assert_eq!(decode_stream(&stream).unwrap(), b"Hello, World!");
    }

    #[test]
    fn test_unsupported_filter() {
        let stream = stream_with(PdfValue::name("Crypt2000"), b"test");
        match decode_stream(&stream) {
            Err(Error::UnsupportedFilter(name)) => assert_eq!(name, "Crypt2000"),
            other => panic!("Expected UnsupportedFilter, got {:?}", other),
        }
    }

    #[test]
    fn test_abbreviated_names() {
        assert_eq!(Filter::from_name("AHx").unwrap(), Filter::ASCIIHexDecode);
        assert_eq!(Filter::from_name("Fl").unwrap(), Filter::FlateDecode);
        assert_eq!(Filter::from_name("RL").unwrap(), Filter::RunLengthDecode);
    }

    #[test]
    fn test_chain_in_order() {
        // ASCIIHex of the ASCII85 encoding of "Hello"
        let a85 = b"87cURDZ~>";
        let hex: String = a85.iter().map(|b| format!("{:02X}", b)).collect();
        let stream = stream_with(
            PdfValue::Array(vec![PdfValue::name("ASCIIHexDecode"), PdfValue::name("ASCII85Decode")]),
            hex.as_bytes(),
        );
        assert_eq!(decode_stream(&stream).unwrap(), b"Hello");
    }

    #[test]
    fn test_opaque_filter_stops_chain() {
        let stream = stream_with(
            PdfValue::Array(vec![PdfValue::name("AHx"), PdfValue::name("DCTDecode")]),
            b"FFD8FF>",
        );
        assert_eq!(decode_stream(&stream).unwrap(), vec![0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_size_limit() {
        let stream = stream_with(PdfValue::name("RunLengthDecode"), &[129, b'x', 128]);
        let options = ParserOptions {
            max_decompressed_size: 64,
            ..ParserOptions::default()
        };
        assert!(matches!(decode_stream_with_options(&stream, &options), Err(Error::Decode(_))));
        assert_eq!(decode_stream(&stream).unwrap().len(), 128);
    }
}
