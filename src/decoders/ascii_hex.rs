//! ASCIIHexDecode implementation.
//!
//! Decodes hexadecimal-encoded data (e.g., "48656C6C6F>" -> "Hello").
//! Whitespace is ignored, `>` ends the data, and an odd final digit is
//! padded with an implicit '0'.

use crate::decoders::{DecodeParams, StreamDecoder};
use crate::error::{Error, Result};

/// ASCIIHexDecode filter implementation.
pub struct AsciiHexDecoder;

impl StreamDecoder for AsciiHexDecoder {
    fn decode(&self, input: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
        match self.decode_partial(input, params) {
            (output, None) => Ok(output),
            (_, Some(e)) => Err(e),
        }
    }

    fn decode_partial(&self, input: &[u8], _params: &DecodeParams) -> (Vec<u8>, Option<Error>) {
        let mut output = Vec::with_capacity(input.len() / 2);
        let mut high: Option<u8> = None;

        for (pos, &c) in input.iter().enumerate() {
            if c == b'>' {
                break;
            }
            if c.is_ascii_whitespace() || c == 0 {
                continue;
            }
            let Some(nibble) = hex_digit_to_value(c) else {
                return (
                    output,
                    Some(Error::filter(
                        "ASCIIHexDecode",
                        pos,
                        format!("invalid hex digit '{}'", c as char),
                    )),
                );
            };
            match high.take() {
                Some(h) => output.push((h << 4) | nibble),
                None => high = Some(nibble),
            }
        }

        // Odd number of digits: the last one is followed by an implicit 0
        if let Some(h) = high {
            output.push(h << 4);
        }
        (output, None)
    }

    fn encode(&self, input: &[u8], _params: &DecodeParams) -> Result<Vec<u8>> {
        const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
        let mut output = Vec::with_capacity(input.len() * 2 + 1);
        for &b in input {
            output.push(DIGITS[(b >> 4) as usize]);
            output.push(DIGITS[(b & 0x0F) as usize]);
        }
        output.push(b'>');
        Ok(output)
    }

    fn name(&self) -> &str {
        "ASCIIHexDecode"
    }
}

/// Convert a hexadecimal ASCII character to its numeric value.
fn hex_digit_to_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        _ => None,
    }
}
