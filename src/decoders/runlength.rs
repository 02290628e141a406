//! RunLengthDecode implementation.
//!
//! - Length byte 0-127: copy the next N+1 bytes literally
//! - Length byte 128: end of data
//! - Length byte 129-255: repeat the next byte 257-N times

use crate::decoders::{DecodeParams, StreamDecoder};
use crate::error::{Error, Result};

/// RunLengthDecode filter implementation.
pub struct RunLengthDecoder;

const NAME: &str = "RunLengthDecode";

impl StreamDecoder for RunLengthDecoder {
    fn decode(&self, input: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
        match self.decode_partial(input, params) {
            (output, None) => Ok(output),
            (_, Some(e)) => Err(e),
        }
    }

    fn decode_partial(&self, input: &[u8], _params: &DecodeParams) -> (Vec<u8>, Option<Error>) {
        let mut output = Vec::new();
        let mut i = 0;

        while i < input.len() {
            let length = input[i];
            i += 1;

            match length {
                0..=127 => {
                    let count = length as usize + 1;
                    if i + count > input.len() {
                        output.extend_from_slice(&input[i..]);
                        return (
                            output,
                            Some(Error::filter(
                                NAME,
                                i,
                                format!("literal run of {} bytes, {} available", count, input.len() - i),
                            )),
                        );
                    }
                    output.extend_from_slice(&input[i..i + count]);
                    i += count;
                },
                128 => break,
                129..=255 => {
                    let Some(&byte) = input.get(i) else {
                        return (output, Some(Error::filter(NAME, i, "missing byte for run")));
                    };
                    i += 1;
                    output.resize(output.len() + (257 - length as usize), byte);
                },
            }
        }

        (output, None)
    }

    fn encode(&self, input: &[u8], _params: &DecodeParams) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() + input.len() / 128 + 2);
        let mut i = 0;

        while i < input.len() {
            let run = input[i..].iter().take(128).take_while(|&&b| b == input[i]).count();
            if run >= 2 {
                output.push((257 - run) as u8);
                output.push(input[i]);
                i += run;
                continue;
            }

            // Literal run: up to the next pair of repeated bytes
            let start = i;
            while i < input.len() && i - start < 128 {
                if i + 1 < input.len() && input[i] == input[i + 1] {
                    break;
                }
                i += 1;
            }
            output.push((i - start - 1) as u8);
            output.extend_from_slice(&input[start..i]);
        }

        output.push(128);
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
        RunLengthDecoder.decode(input, &DecodeParams::default())
    }

    #[test]
    fn test_runlength_literal() {
        assert_eq!(decode(&[2, b'a', b'b', b'c', 128]).unwrap(), b"abc");
    }

    #[test]
    fn test_runlength_repeat() {
        // 257 - 253 = 4 repetitions
        assert_eq!(decode(&[253, b'x', 128]).unwrap(), b"xxxx");
    }

    #[test]
    fn test_runlength_without_eod() {
        assert_eq!(decode(&[0, b'q']).unwrap(), b"q");
    }

    #[test]
    fn test_runlength_truncated_literal() {
        let (out, err) = RunLengthDecoder.decode_partial(&[4, b'a', b'b'], &DecodeParams::default());
        assert_eq!(out, b"ab");
        assert!(err.is_some());
    }

    #[test]
    fn test_runlength_encode_mixed() {
        let data = b"abcccccccd";
        let encoded = RunLengthDecoder.encode(data, &DecodeParams::default()).unwrap();
        assert_eq!(encoded.last(), Some(&128));
        assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_runlength_encode_long_run() {
        let data = vec![7u8; 300];
        let encoded = RunLengthDecoder.encode(&data, &DecodeParams::default()).unwrap();
        // 128 + 128 + 44
        assert_eq!(encoded.len(), 7);
        assert_eq!(decode(&encoded).unwrap(), data);
    }
}
