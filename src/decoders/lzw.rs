//! LZWDecode implementation for PDF.
//!
//! PDF's LZW variant:
//! - Uses MSB-first bit ordering
//! - Starts with 9-bit codes and grows to 12
//! - With `/EarlyChange 1` (the default) the code width grows one code
//!   earlier than GIF, which is the TIFF convention
//! - Clear code is 256, EOD code is 257, first table code is 258

use weezl::{decode::Decoder as WeezlDecoder, encode::Encoder as WeezlEncoder, BitOrder};

use crate::decoders::{DecodeParams, StreamDecoder};
use crate::error::{Error, Result};

/// LZWDecode filter implementation.
pub struct LzwDecoder;

const NAME: &str = "LZWDecode";

impl StreamDecoder for LzwDecoder {
    fn decode(&self, input: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
        match self.decode_partial(input, params) {
            (output, None) => Ok(output),
            (_, Some(e)) => Err(e),
        }
    }

    fn decode_partial(&self, input: &[u8], params: &DecodeParams) -> (Vec<u8>, Option<Error>) {
        // weezl needs a terminating EOD code; fall back to the table decoder
        // for streams that end without one or are damaged
        let mut decoder = if params.early_change != 0 {
            WeezlDecoder::with_tiff_size_switch(BitOrder::Msb, 8)
        } else {
            WeezlDecoder::new(BitOrder::Msb, 8)
        };
        match decoder.decode(input) {
            Ok(output) => (output, None),
            Err(e) => {
                log::debug!("weezl LZW decode failed ({:?}), using table decoder", e);
                decode_lzw_table(input, params.early_change != 0)
            },
        }
    }

    fn encode(&self, input: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
        let mut encoder = if params.early_change != 0 {
            WeezlEncoder::with_tiff_size_switch(BitOrder::Msb, 8)
        } else {
            WeezlEncoder::new(BitOrder::Msb, 8)
        };
        encoder
            .encode(input)
            .map_err(|e| Error::filter(NAME, 0, format!("encoder failed: {:?}", e)))
    }

    fn name(&self) -> &str {
        NAME
    }
}

/// Table-driven decoder that tolerates a missing EOD code and keeps the
/// output produced before an invalid code.
fn decode_lzw_table(input: &[u8], early_change: bool) -> (Vec<u8>, Option<Error>) {
    const CLEAR_CODE: usize = 256;
    const EOD_CODE: usize = 257;
    const FIRST_CODE: usize = 258;
    const MAX_CODE_BITS: u32 = 12;

    let early = early_change as usize;
    let mut output = Vec::new();
    let mut table: Vec<Vec<u8>> = initial_table();
    let mut code_bits = 9;
    let mut bits = BitReader::new(input);
    let mut prev: Option<usize> = None;

    loop {
        while code_bits < MAX_CODE_BITS && table.len() + early >= (1 << code_bits) {
            code_bits += 1;
        }

        let Some(code) = bits.read_bits(code_bits) else {
            break; // End of data without EOD
        };
        let code = code as usize;

        if code == EOD_CODE {
            break;
        }
        if code == CLEAR_CODE {
            table.truncate(FIRST_CODE);
            code_bits = 9;
            prev = None;
            continue;
        }

        let entry = if code < table.len() {
            table[code].clone()
        } else if let (true, Some(p)) = (code == table.len(), prev) {
            // KwKwK case: previous string plus its own first byte
            let mut s = table[p].clone();
            s.push(table[p][0]);
            s
        } else {
            let offset = bits.byte_pos();
            return (
                output,
                Some(Error::filter(
                    NAME,
                    offset,
                    format!("invalid code {} (table size {}, width {})", code, table.len(), code_bits),
                )),
            );
        };

        output.extend_from_slice(&entry);

        if let Some(p) = prev {
            if table.len() < 4096 {
                let mut added = table[p].clone();
                added.push(entry[0]);
                table.push(added);
            }
        }
        prev = Some(code);
    }

    (output, None)
}

/// Table of single-byte strings plus placeholders for the clear and EOD codes.
fn initial_table() -> Vec<Vec<u8>> {
    let mut table: Vec<Vec<u8>> = (0..=255u8).map(|b| vec![b]).collect();
    table.push(Vec::new()); // 256: clear
    table.push(Vec::new()); // 257: EOD
    table
}

/// Bit reader for MSB-first bit ordering.
struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    fn byte_pos(&self) -> usize {
        self.bit_pos / 8
    }

    fn read_bits(&mut self, n: u32) -> Option<u32> {
        if self.bit_pos + n as usize > self.data.len() * 8 {
            return None;
        }
        let mut result = 0u32;
        for _ in 0..n {
            let byte = self.data[self.bit_pos / 8];
            let bit = (byte >> (7 - (self.bit_pos % 8))) & 1;
            result = (result << 1) | bit as u32;
            self.bit_pos += 1;
        }
        Some(result)
    }
}
