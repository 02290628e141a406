//! FlateDecode (zlib/deflate) implementation.
//!
//! This is the most common PDF compression filter. Decoding uses the flate2
//! crate, with fallbacks for streams that producers damaged: a missing or bad
//! checksum, a corrupt zlib header, or raw deflate data without a wrapper.

use std::io::{Read, Write};

use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use inflate::inflate_bytes_zlib;
use libflate::zlib::Decoder as LibflateDecoder;

use crate::decoders::{DecodeParams, StreamDecoder};
use crate::error::{Error, Result};

/// FlateDecode filter implementation.
pub struct FlateDecoder;

const NAME: &str = "FlateDecode";

impl StreamDecoder for FlateDecoder {
    fn decode(&self, input: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
        match self.decode_partial(input, params) {
            (output, None) => Ok(output),
            (_, Some(e)) => Err(e),
        }
    }

    fn decode_partial(&self, input: &[u8], _params: &DecodeParams) -> (Vec<u8>, Option<Error>) {
        let mut output = Vec::new();
        let zlib_err = match ZlibDecoder::new(input).read_to_end(&mut output) {
            Ok(_) => return (output, None),
            Err(e) => e,
        };
        let mut best = output;

        // Strategy 2: the deflate body may be intact behind a damaged header
        // or in front of a missing Adler-32 checksum
        if input.len() > 2 {
            let mut body = Vec::new();
            if DeflateDecoder::new(&input[2..]).read_to_end(&mut body).is_ok() {
                log::info!("FlateDecode recovered {} bytes by skipping the zlib header", body.len());
                return (body, None);
            }
            if body.len() > best.len() {
                best = body;
            }
        }

        // Strategy 3: raw deflate without zlib wrapper
        let mut raw = Vec::new();
        if DeflateDecoder::new(input).read_to_end(&mut raw).is_ok() {
            log::info!("FlateDecode recovered {} bytes as raw deflate", raw.len());
            return (raw, None);
        }
        if raw.len() > best.len() {
            best = raw;
        }

        // Strategy 4: inflate crate (different error tolerance)
        if let Ok(data) = inflate_bytes_zlib(input) {
            log::info!("FlateDecode recovered {} bytes with inflate", data.len());
            return (data, None);
        }

        // Strategy 5: libflate
        if let Ok(mut decoder) = LibflateDecoder::new(input) {
            let mut out = Vec::new();
            if decoder.read_to_end(&mut out).is_ok() && !out.is_empty() {
                log::info!("FlateDecode recovered {} bytes with libflate", out.len());
                return (out, None);
            }
            if out.len() > best.len() {
                best = out;
            }
        }

        log::debug!(
            "FlateDecode failed on {} bytes ({} recovered): {}",
            input.len(),
            best.len(),
            zlib_err
        );
        let offset = input.len().min(best.len());
        (
            best,
            Some(Error::filter(NAME, offset, format!("corrupt deflate data: {}", zlib_err))),
        )
    }

    fn encode(&self, input: &[u8], _params: &DecodeParams) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(input)?;
        Ok(encoder.finish()?)
    }

    fn name(&self) -> &str {
        NAME
    }
}
