//! Stream filters for PDF stream bodies.
//!
//! This module provides both directions of the PDF filter set:
//! - FlateDecode (zlib/deflate) - most common
//! - ASCIIHexDecode - hexadecimal encoding
//! - ASCII85Decode - base85 encoding
//! - LZWDecode - LZW compression
//! - RunLengthDecode - run-length encoding
//! - DCTDecode, CCITTFaxDecode, JBIG2Decode, JPXDecode - routed to an
//!   injected [`ImageCodec`]
//!
//! Filters are chained through a [`FilterPipeline`], which applies them in the
//! order declared by `/Filter` and reverses that order on encode.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::object::{Dictionary, Name, Object};
use crate::parser_config::ParserOptions;

mod ascii85;
mod ascii_hex;
mod flate;
mod image_codec;
mod lzw;
mod predictor;
mod runlength;

pub use ascii_hex::AsciiHexDecoder;
pub use ascii85::Ascii85Decoder;
pub use flate::FlateDecoder;
pub use image_codec::{DecodedImage, ImageCodec, JpegCodec};
pub use lzw::LzwDecoder;
pub use predictor::{decode_predictor, encode_predictor, PngPredictor};
pub use runlength::RunLengthDecoder;

/// Security limits for decompression (decompression bomb protection).
///
/// ISO 32000-1:2008 does not specify decompression limits; these defaults
/// match [`ParserOptions::lenient`].
const DEFAULT_MAX_DECOMPRESSION_RATIO: u32 = 100;
const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 100 * 1024 * 1024;

/// PDF stream filter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    /// FlateDecode (deflate/zlib compression)
    FlateDecode,
    /// ASCIIHexDecode (hexadecimal encoding)
    ASCIIHexDecode,
    /// ASCII85Decode (base-85 encoding)
    ASCII85Decode,
    /// LZWDecode (Lempel-Ziv-Welch compression)
    LZWDecode,
    /// RunLengthDecode (run-length encoding)
    RunLengthDecode,
    /// DCTDecode (JPEG compression)
    DCTDecode,
    /// CCITTFaxDecode (CCITT Fax compression)
    CCITTFaxDecode,
    /// JBIG2Decode (JBIG2 compression)
    JBIG2Decode,
    /// JPXDecode (JPEG 2000)
    JPXDecode,
}

impl Filter {
    /// Look up a filter by its full name or the abbreviation used in inline images.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "FlateDecode" | "Fl" => Filter::FlateDecode,
            "ASCIIHexDecode" | "AHx" => Filter::ASCIIHexDecode,
            "ASCII85Decode" | "A85" => Filter::ASCII85Decode,
            "LZWDecode" | "LZW" => Filter::LZWDecode,
            "RunLengthDecode" | "RL" => Filter::RunLengthDecode,
            "DCTDecode" | "DCT" => Filter::DCTDecode,
            "CCITTFaxDecode" | "CCF" => Filter::CCITTFaxDecode,
            "JBIG2Decode" => Filter::JBIG2Decode,
            "JPXDecode" => Filter::JPXDecode,
            _ => return None,
        })
    }

    /// Canonical filter name.
    pub fn name(&self) -> &'static str {
        match self {
            Filter::FlateDecode => "FlateDecode",
            Filter::ASCIIHexDecode => "ASCIIHexDecode",
            Filter::ASCII85Decode => "ASCII85Decode",
            Filter::LZWDecode => "LZWDecode",
            Filter::RunLengthDecode => "RunLengthDecode",
            Filter::DCTDecode => "DCTDecode",
            Filter::CCITTFaxDecode => "CCITTFaxDecode",
            Filter::JBIG2Decode => "JBIG2Decode",
            Filter::JPXDecode => "JPXDecode",
        }
    }

    /// True for filters whose payload is handed to an image codec.
    pub fn is_image_codec(&self) -> bool {
        matches!(
            self,
            Filter::DCTDecode | Filter::CCITTFaxDecode | Filter::JBIG2Decode | Filter::JPXDecode
        )
    }

    /// True for filters that reproduce their input exactly.
    pub fn is_lossless(&self) -> bool {
        !self.is_image_codec()
    }
}

/// One entry of a stream's filter chain: the filter name and its `/DecodeParms`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    /// Filter name as written in the file (abbreviations allowed)
    pub name: Name,
    /// Decode parameters, if any
    pub params: Option<Dictionary>,
}

impl FilterSpec {
    /// Filter without parameters.
    pub fn new(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            params: None,
        }
    }

    /// Filter with a parameter dictionary.
    pub fn with_params(name: impl Into<Name>, params: Dictionary) -> Self {
        Self {
            name: name.into(),
            params: Some(params),
        }
    }

    /// Read the chain from a stream dictionary's `/Filter` and `/DecodeParms`
    /// (or the inline-image abbreviations `/F` and `/DP`).
    ///
    /// Indirect references are not followed here; the document resolves them
    /// before decoding.
    pub fn chain_from_dict(dict: &Dictionary) -> Vec<FilterSpec> {
        let filter = dict.get("Filter").or_else(|| dict.get("F"));
        let parms = dict.get("DecodeParms").or_else(|| dict.get("DP"));

        let names: Vec<Name> = match filter {
            Some(Object::Name(n)) => vec![n.clone()],
            Some(Object::Array(items)) => items.iter().filter_map(|o| o.as_name().cloned()).collect(),
            _ => return Vec::new(),
        };

        let params: Vec<Option<Dictionary>> = match parms {
            Some(Object::Dictionary(d)) => vec![Some(d.clone())],
            Some(Object::Array(items)) => items.iter().map(|o| o.as_dict().cloned()).collect(),
            _ => Vec::new(),
        };

        names
            .into_iter()
            .enumerate()
            .map(|(i, name)| FilterSpec {
                name,
                params: params.get(i).cloned().flatten(),
            })
            .collect()
    }

    /// Write a chain back into a dictionary as `/Filter` and `/DecodeParms`.
    pub fn write_chain(dict: &mut Dictionary, chain: &[FilterSpec]) {
        dict.remove("Filter");
        dict.remove("DecodeParms");
        match chain {
            [] => {},
            [only] => {
                dict.set("Filter", Object::Name(only.name.clone()));
                if let Some(p) = &only.params {
                    dict.set("DecodeParms", Object::Dictionary(p.clone()));
                }
            },
            many => {
                dict.set(
                    "Filter",
                    Object::Array(many.iter().map(|f| Object::Name(f.name.clone())).collect()),
                );
                if many.iter().any(|f| f.params.is_some()) {
                    let parms = many
                        .iter()
                        .map(|f| f.params.clone().map(Object::Dictionary).unwrap_or(Object::Null))
                        .collect();
                    dict.set("DecodeParms", Object::Array(parms));
                }
            },
        }
    }

    /// Resolve the name to a known filter.
    pub fn filter(&self) -> Result<Filter> {
        let name = self.name.to_string_lossy();
        Filter::from_name(&name).ok_or(Error::UnsupportedFilter(name))
    }

    /// Numeric decode parameters.
    pub fn decode_params(&self) -> DecodeParams {
        self.params
            .as_ref()
            .map(DecodeParams::from_dict)
            .unwrap_or_default()
    }
}

/// Decode parameters shared by Flate and LZW.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeParams {
    /// Predictor algorithm (1 = none, 2 = TIFF, 10-15 = PNG)
    pub predictor: i64,
    /// Number of columns (samples per row)
    pub columns: usize,
    /// Number of color components per sample (default 1)
    pub colors: usize,
    /// Bits per component (default 8)
    pub bits_per_component: usize,
    /// LZW code-width switch timing (default 1)
    pub early_change: i64,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            predictor: 1, // No prediction
            columns: 1,
            colors: 1,
            bits_per_component: 8,
            early_change: 1,
        }
    }
}

impl DecodeParams {
    /// Read parameters from a `/DecodeParms` dictionary, defaulting missing keys.
    pub fn from_dict(dict: &Dictionary) -> Self {
        let defaults = Self::default();
        let positive = |key: &str, default: usize| {
            dict.get_integer(key)
                .filter(|v| *v > 0)
                .map(|v| v as usize)
                .unwrap_or(default)
        };
        Self {
            predictor: dict.get_integer("Predictor").unwrap_or(defaults.predictor),
            columns: positive("Columns", defaults.columns),
            colors: positive("Colors", defaults.colors),
            bits_per_component: positive("BitsPerComponent", defaults.bits_per_component),
            early_change: dict.get_integer("EarlyChange").unwrap_or(defaults.early_change),
        }
    }

    /// Bytes of sample data per row (without the PNG tag byte).
    pub fn pixel_bytes_per_row(&self) -> usize {
        (self.columns * self.colors * self.bits_per_component).div_ceil(8)
    }

    /// Bytes per complete pixel, at least one.
    pub fn bytes_per_pixel(&self) -> usize {
        (self.colors * self.bits_per_component).div_ceil(8).max(1)
    }

    /// True if a predictor other than "none" is selected.
    pub fn has_predictor(&self) -> bool {
        self.predictor > 1
    }
}

/// Trait for PDF stream filters.
///
/// Each filter implements one algorithm in both directions. `decode_partial`
/// returns the bytes produced before a failure so that the pipeline can
/// truncate image streams instead of discarding them.
pub trait StreamDecoder {
    /// Decode the input data.
    fn decode(&self, input: &[u8], params: &DecodeParams) -> Result<Vec<u8>>;

    /// Encode data so that `decode` reproduces it.
    fn encode(&self, input: &[u8], params: &DecodeParams) -> Result<Vec<u8>>;

    /// Decode, keeping whatever output was produced before an error.
    fn decode_partial(&self, input: &[u8], params: &DecodeParams) -> (Vec<u8>, Option<Error>) {
        match self.decode(input, params) {
            Ok(data) => (data, None),
            Err(e) => (Vec::new(), Some(e)),
        }
    }

    /// Get the name of this filter (e.g., "FlateDecode").
    fn name(&self) -> &str;
}

fn stream_decoder(filter: Filter) -> Option<Box<dyn StreamDecoder>> {
    Some(match filter {
        Filter::FlateDecode => Box::new(FlateDecoder),
        Filter::ASCIIHexDecode => Box::new(AsciiHexDecoder),
        Filter::ASCII85Decode => Box::new(Ascii85Decoder),
        Filter::LZWDecode => Box::new(LzwDecoder),
        Filter::RunLengthDecode => Box::new(RunLengthDecoder),
        _ => return None,
    })
}

/// Result of running a filter chain.
#[derive(Debug)]
pub struct DecodeOutcome {
    /// Decoded bytes (possibly truncated)
    pub data: Vec<u8>,
    /// The error that cut decoding short, when truncation was allowed
    pub truncated_by: Option<Error>,
}

/// Applies filter chains with decompression limits and an optional image codec.
///
/// The pipeline holds no mutable state and may be shared across threads.
#[derive(Clone)]
pub struct FilterPipeline {
    max_ratio: u32,
    max_size: usize,
    codec: Option<Arc<dyn ImageCodec>>,
}

impl std::fmt::Debug for FilterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterPipeline")
            .field("max_ratio", &self.max_ratio)
            .field("max_size", &self.max_size)
            .field("codec", &self.codec.is_some())
            .finish()
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self {
            max_ratio: DEFAULT_MAX_DECOMPRESSION_RATIO,
            max_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
            codec: None,
        }
    }
}

impl FilterPipeline {
    /// Pipeline using the limits from parser options.
    pub fn from_options(options: &ParserOptions) -> Self {
        Self {
            max_ratio: options.max_decompression_ratio,
            max_size: options.max_decompressed_size,
            codec: None,
        }
    }

    /// Install an image codec for DCT/CCITT/JBIG2/JPX payloads.
    pub fn with_image_codec(mut self, codec: Arc<dyn ImageCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// The installed image codec.
    pub fn image_codec(&self) -> Option<&Arc<dyn ImageCodec>> {
        self.codec.as_ref()
    }

    /// Decode `data` through `chain`.
    ///
    /// When `allow_truncation` is set (image streams), a filter failure keeps
    /// the bytes produced so far and reports the error in
    /// [`DecodeOutcome::truncated_by`]; otherwise the error propagates.
    /// Limit violations always propagate.
    pub fn decode(
        &self,
        data: &[u8],
        chain: &[FilterSpec],
        allow_truncation: bool,
    ) -> Result<DecodeOutcome> {
        let compressed_size = data.len();
        let mut current = data.to_vec();
        let mut truncated_by = None;

        for spec in chain {
            let filter = spec.filter()?;
            let params = spec.decode_params();

            let (mut output, failure) = if filter.is_image_codec() {
                match self.decode_with_codec(filter, &current, spec.params.as_ref()) {
                    Ok(pixels) => (pixels, None),
                    Err(e) => (Vec::new(), Some(e)),
                }
            } else if let Some(decoder) = stream_decoder(filter) {
                if allow_truncation {
                    decoder.decode_partial(&current, &params)
                } else {
                    match decoder.decode(&current, &params) {
                        Ok(out) => (out, None),
                        Err(e) => return Err(e),
                    }
                }
            } else {
                return Err(Error::UnsupportedFilter(filter.name().to_string()));
            };

            if let Some(err) = failure {
                if !allow_truncation {
                    return Err(err);
                }
                log::warn!(
                    "{} failed after {} bytes, truncating: {}",
                    filter.name(),
                    output.len(),
                    err
                );
                truncated_by.get_or_insert(err);
            }

            if params.has_predictor()
                && matches!(filter, Filter::FlateDecode | Filter::LZWDecode)
            {
                output = match decode_predictor(&output, &params) {
                    Ok(out) => out,
                    Err(e) if allow_truncation => {
                        truncated_by.get_or_insert(e);
                        output
                    },
                    Err(e) => return Err(e),
                };
            }

            self.check_limits(compressed_size, output.len())?;
            current = output;
        }

        Ok(DecodeOutcome {
            data: current,
            truncated_by,
        })
    }

    /// Decode an image payload into pixels using the installed codec.
    ///
    /// Lossless filters before the codec stage are applied first.
    pub fn decode_image(
        &self,
        data: &[u8],
        chain: &[FilterSpec],
        image_dict: &Dictionary,
    ) -> Result<DecodedImage> {
        let Some(codec_at) = chain
            .iter()
            .position(|s| s.filter().map(|f| f.is_image_codec()).unwrap_or(false))
        else {
            return Err(Error::Codec("stream has no image codec filter".into()));
        };
        let prefix = self.decode(data, &chain[..codec_at], false)?;
        let spec = &chain[codec_at];
        let filter = spec.filter()?;
        let codec = self
            .codec
            .as_ref()
            .ok_or_else(|| Error::Codec(format!("no image codec installed for {}", filter.name())))?;
        let mut params = image_dict.clone();
        if let Some(p) = &spec.params {
            for (k, v) in p {
                params.set(k.clone(), v.clone());
            }
        }
        codec.decode(filter.name(), &prefix.data, &params)
    }

    fn decode_with_codec(
        &self,
        filter: Filter,
        data: &[u8],
        params: Option<&Dictionary>,
    ) -> Result<Vec<u8>> {
        match &self.codec {
            Some(codec) if codec.supports(filter.name()) => {
                let empty = Dictionary::new();
                let image = codec.decode(filter.name(), data, params.unwrap_or(&empty))?;
                Ok(image.pixels)
            },
            _ => {
                // No backend: hand the compressed payload through unchanged
                log::debug!("No codec for {}, passing {} bytes through", filter.name(), data.len());
                Ok(data.to_vec())
            },
        }
    }

    fn check_limits(&self, compressed_size: usize, decoded_size: usize) -> Result<()> {
        if self.max_ratio > 0 && compressed_size > 0 {
            let ratio = decoded_size as u64 / compressed_size as u64;
            if ratio > self.max_ratio as u64 {
                return Err(Error::DecompressionLimit(format!(
                    "ratio {}:1 exceeds limit {}:1 (compressed: {} bytes, decompressed: {} bytes)",
                    ratio, self.max_ratio, compressed_size, decoded_size
                )));
            }
        }
        if self.max_size > 0 && decoded_size > self.max_size {
            return Err(Error::DecompressionLimit(format!(
                "decompressed size {} bytes exceeds limit {} bytes",
                decoded_size, self.max_size
            )));
        }
        Ok(())
    }

    /// Encode `data` so that decoding through `chain` reproduces it.
    ///
    /// Filters are applied in reverse declaration order. Image codec filters
    /// cannot be produced and yield [`Error::UnsupportedFilter`].
    pub fn encode(&self, data: &[u8], chain: &[FilterSpec]) -> Result<Vec<u8>> {
        let mut current = data.to_vec();
        for spec in chain.iter().rev() {
            let filter = spec.filter()?;
            let params = spec.decode_params();
            let decoder = stream_decoder(filter)
                .ok_or_else(|| Error::UnsupportedFilter(format!("{} (encode)", filter.name())))?;
            if params.has_predictor() && matches!(filter, Filter::FlateDecode | Filter::LZWDecode) {
                current = encode_predictor(&current, &params)?;
            }
            current = decoder.encode(&current, &params)?;
        }
        Ok(current)
    }
}

/// Decode stream data through a chain of filter names with default limits.
pub fn decode_stream(data: &[u8], filters: &[&str]) -> Result<Vec<u8>> {
    let chain: Vec<FilterSpec> = filters.iter().map(|f| FilterSpec::new(*f)).collect();
    Ok(FilterPipeline::default().decode(data, &chain, false)?.data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict;

    #[test]
    fn test_decode_stream_no_filters() {
        let data = b"Hello, World!";
        let result = decode_stream(data, &[]).unwrap();
        assert_eq!(result, data);
    }

    #[test]
    fn test_decode_stream_unsupported_filter() {
        let result = decode_stream(b"test", &["UnsupportedFilter"]);
        match result {
            Err(Error::UnsupportedFilter(name)) => assert_eq!(name, "UnsupportedFilter"),
            other => panic!("Expected UnsupportedFilter error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_stream_pipeline() {
        let result = decode_stream(b"48656C6C6F>", &["ASCIIHexDecode"]).unwrap();
        assert_eq!(result, b"Hello");
    }

    #[test]
    fn test_abbreviated_filter_names() {
        assert_eq!(Filter::from_name("AHx"), Some(Filter::ASCIIHexDecode));
        assert_eq!(Filter::from_name("Fl"), Some(Filter::FlateDecode));
        assert_eq!(Filter::from_name("CCF"), Some(Filter::CCITTFaxDecode));
    }

    #[test]
    fn test_chain_from_dict_with_null_params() {
        let d = dict! {
            "Filter" => vec![Object::from("ASCII85Decode"), Object::from("FlateDecode")],
            "DecodeParms" => vec![Object::Null, Object::Dictionary(dict! { "Predictor" => 12, "Columns" => 4 })],
        };
        let chain = FilterSpec::chain_from_dict(&d);
        assert_eq!(chain.len(), 2);
        assert!(chain[0].params.is_none());
        let p = chain[1].decode_params();
        assert_eq!(p.predictor, 12);
        assert_eq!(p.columns, 4);
    }

    #[test]
    fn test_write_chain_roundtrip() {
        let chain = vec![
            FilterSpec::new("ASCIIHexDecode"),
            FilterSpec::with_params("FlateDecode", dict! { "Predictor" => 2 }),
        ];
        let mut d = Dictionary::new();
        FilterSpec::write_chain(&mut d, &chain);
        assert_eq!(FilterSpec::chain_from_dict(&d), chain);
    }

    #[test]
    fn test_chain_roundtrip_with_predictor() {
        let chain = vec![
            FilterSpec::new("ASCII85Decode"),
            FilterSpec::with_params("FlateDecode", dict! { "Predictor" => 12, "Columns" => 4 }),
        ];
        let pipeline = FilterPipeline::default();
        let original = [0u8, 1, 2, 3, 4, 5, 6, 7];
        let encoded = pipeline.encode(&original, &chain).unwrap();
        let decoded = pipeline.decode(&encoded, &chain, false).unwrap();
        assert_eq!(decoded.data, original);
        assert!(decoded.truncated_by.is_none());
    }

    #[test]
    fn test_ratio_limit() {
        let pipeline = FilterPipeline::default();
        let zeros = vec![0u8; 1_000_000];
        let chain = vec![FilterSpec::new("FlateDecode")];
        let encoded = pipeline.encode(&zeros, &chain).unwrap();
        let result = pipeline.decode(&encoded, &chain, false);
        assert!(matches!(result, Err(Error::DecompressionLimit(_))));

        let unlimited = FilterPipeline::from_options(&ParserOptions::very_lenient());
        assert_eq!(unlimited.decode(&encoded, &chain, false).unwrap().data.len(), 1_000_000);
    }

    #[test]
    fn test_truncation_only_when_allowed() {
        let chain = vec![FilterSpec::new("ASCIIHexDecode")];
        let pipeline = FilterPipeline::default();
        let bad = b"4142zz>";
        assert!(pipeline.decode(bad, &chain, false).is_err());
        let outcome = pipeline.decode(bad, &chain, true).unwrap();
        assert_eq!(outcome.data, b"AB");
        assert!(outcome.truncated_by.is_some());
    }

    #[test]
    fn test_image_filter_passthrough_without_codec() {
        let chain = vec![FilterSpec::new("DCTDecode")];
        let jpeg = b"\xFF\xD8\xFF\xE0";
        let outcome = FilterPipeline::default().decode(jpeg, &chain, true).unwrap();
        assert_eq!(outcome.data, jpeg);
    }

    #[test]
    fn test_image_filter_cannot_encode() {
        let chain = vec![FilterSpec::new("DCTDecode")];
        assert!(matches!(
            FilterPipeline::default().encode(b"x", &chain),
            Err(Error::UnsupportedFilter(_))
        ));
    }
}
