//! ASCII85Decode (Base85) implementation.
//!
//! Each group of 4 bytes is written as 5 ASCII characters in the range
//! '!' to 'u'. 'z' stands for a group of four zero bytes and `~>` ends the
//! data. A final partial group of n bytes is written as n+1 characters.

use crate::decoders::{DecodeParams, StreamDecoder};
use crate::error::{Error, Result};

/// ASCII85Decode filter implementation.
pub struct Ascii85Decoder;

const NAME: &str = "ASCII85Decode";

impl StreamDecoder for Ascii85Decoder {
    fn decode(&self, input: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
        match self.decode_partial(input, params) {
            (output, None) => Ok(output),
            (_, Some(e)) => Err(e),
        }
    }

    fn decode_partial(&self, input: &[u8], _params: &DecodeParams) -> (Vec<u8>, Option<Error>) {
        let mut output = Vec::with_capacity(input.len() * 4 / 5);
        let mut acc: u64 = 0;
        let mut count = 0;

        // Optional `<~` prefix
        let start = if input.starts_with(b"<~") { 2 } else { 0 };

        for (pos, &byte) in input.iter().enumerate().skip(start) {
            match byte {
                b'~' => break, // End marker '~>'
                b'z' if count == 0 => output.extend_from_slice(&[0, 0, 0, 0]),
                b'z' => {
                    return (output, Some(Error::filter(NAME, pos, "'z' inside a group")));
                },
                b'!'..=b'u' => {
                    acc = acc * 85 + (byte - b'!') as u64;
                    count += 1;
                    if count == 5 {
                        if acc > u32::MAX as u64 {
                            return (output, Some(Error::filter(NAME, pos, "group overflows 32 bits")));
                        }
                        output.extend_from_slice(&(acc as u32).to_be_bytes());
                        acc = 0;
                        count = 0;
                    }
                },
                _ if byte.is_ascii_whitespace() || byte == 0 => {},
                _ => {
                    return (
                        output,
                        Some(Error::filter(NAME, pos, format!("invalid character '{}'", byte as char))),
                    );
                },
            }
        }

        // Trailing partial group: pad with 'u' and keep count-1 bytes
        if count == 1 {
            return (output, Some(Error::filter(NAME, input.len(), "final group has one character")));
        }
        if count > 1 {
            for _ in count..5 {
                acc = acc * 85 + 84;
            }
            if acc > u32::MAX as u64 {
                return (output, Some(Error::filter(NAME, input.len(), "final group overflows 32 bits")));
            }
            let bytes = (acc as u32).to_be_bytes();
            output.extend_from_slice(&bytes[..count - 1]);
        }

        (output, None)
    }

    fn encode(&self, input: &[u8], _params: &DecodeParams) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() * 5 / 4 + 4);
        for chunk in input.chunks(4) {
            let mut group = [0u8; 4];
            group[..chunk.len()].copy_from_slice(chunk);
            let mut value = u32::from_be_bytes(group);

            if chunk.len() == 4 && value == 0 {
                output.push(b'z');
                continue;
            }

            let mut digits = [0u8; 5];
            for d in digits.iter_mut().rev() {
                *d = (value % 85) as u8 + b'!';
                value /= 85;
            }
            output.extend_from_slice(&digits[..chunk.len() + 1]);
        }
        output.extend_from_slice(b"~>");
        Ok(output)
    }

    fn name(&self) -> &str {
        NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(input: &[u8]) -> Result<Vec<u8>> {
        Ascii85Decoder.decode(input, &DecodeParams::default())
    }

    fn encode(input: &[u8]) -> Vec<u8> {
        Ascii85Decoder.encode(input, &DecodeParams::default()).unwrap()
    }

    #[test]
    fn test_ascii85_decode_simple() {
        // "Man " -> "9jqo^"
        assert_eq!(decode(b"9jqo^~>").unwrap(), b"Man ");
    }

    #[test]
    fn test_ascii85_decode_z_and_whitespace() {
        assert_eq!(decode(b"z\n 9jqo^~>").unwrap(), b"\0\0\0\0Man ");
    }

    #[test]
    fn test_ascii85_decode_partial_group() {
        // "Ma" encodes as three characters
        let encoded = encode(b"Ma");
        assert_eq!(encoded.len(), 3 + 2);
        assert_eq!(decode(&encoded).unwrap(), b"Ma");
    }

    #[test]
    fn test_ascii85_prefix_is_ignored() {
        assert_eq!(decode(b"<~9jqo^~>").unwrap(), b"Man ");
    }

    #[test]
    fn test_ascii85_invalid_character() {
        assert!(matches!(decode(b"9jqo^v~>"), Err(Error::Filter { .. })));
    }

    #[test]
    fn test_ascii85_encode_zero_group() {
        assert_eq!(encode(&[0, 0, 0, 0]), b"z~>");
        assert_eq!(encode(b"Man "), b"9jqo^~>");
    }

    #[test]
    fn test_ascii85_partial_output_kept() {
        let (out, err) = Ascii85Decoder.decode_partial(b"9jqo^{", &DecodeParams::default());
        assert_eq!(out, b"Man ");
        assert!(err.is_some());
    }
}
