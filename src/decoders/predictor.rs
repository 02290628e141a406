//! Predictor functions applied after FlateDecode and LZWDecode.
//!
//! Predictors store differences between neighbouring samples, which
//! compress better than the samples themselves. `/Predictor 2` is the TIFF
//! horizontal predictor; values 10-15 select PNG filtering, where every row
//! starts with a tag byte naming the filter used for that row.

use crate::decoders::DecodeParams;
use crate::error::{Error, Result};

/// PNG filter types, as stored in each row's tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PngPredictor {
    /// No prediction (tag 0)
    None = 0,
    /// Difference from the byte to the left (tag 1)
    Sub = 1,
    /// Difference from the byte above (tag 2)
    Up = 2,
    /// Difference from the average of left and above (tag 3)
    Average = 3,
    /// Paeth predictor (tag 4)
    Paeth = 4,
}

impl PngPredictor {
    fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => PngPredictor::None,
            1 => PngPredictor::Sub,
            2 => PngPredictor::Up,
            3 => PngPredictor::Average,
            4 => PngPredictor::Paeth,
            _ => return None,
        })
    }

    /// Filter used when encoding with a given `/Predictor` value.
    /// 15 ("optimum") lets the encoder choose; Up is used.
    fn for_predictor(predictor: i64) -> Self {
        match predictor {
            10 => PngPredictor::None,
            11 => PngPredictor::Sub,
            13 => PngPredictor::Average,
            14 => PngPredictor::Paeth,
            _ => PngPredictor::Up,
        }
    }
}

/// Reverse the predictor selected by `params`.
pub fn decode_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    match params.predictor {
        1 => Ok(data.to_vec()),
        2 => tiff_predictor(data, params, false),
        10..=15 => decode_png(data, params),
        other => Err(Error::filter("Predictor", 0, format!("unsupported predictor {}", other))),
    }
}

/// Apply the predictor selected by `params`, producing data that
/// [`decode_predictor`] turns back into `data`.
pub fn encode_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    match params.predictor {
        1 => Ok(data.to_vec()),
        2 => tiff_predictor(data, params, true),
        10..=15 => encode_png(data, params),
        other => Err(Error::filter("Predictor", 0, format!("unsupported predictor {}", other))),
    }
}

/// TIFF Predictor 2 for 8-bit components: each sample is stored as the
/// difference from the same component of the previous pixel.
fn tiff_predictor(data: &[u8], params: &DecodeParams, encode: bool) -> Result<Vec<u8>> {
    if params.bits_per_component != 8 {
        return Err(Error::filter(
            "Predictor",
            0,
            format!("TIFF predictor with {} bits per component", params.bits_per_component),
        ));
    }
    let row_len = params.pixel_bytes_per_row();
    let colors = params.colors;
    let mut output = data.to_vec();

    for row in output.chunks_mut(row_len) {
        if encode {
            for i in (colors..row.len()).rev() {
                row[i] = row[i].wrapping_sub(row[i - colors]);
            }
        } else {
            for i in colors..row.len() {
                row[i] = row[i].wrapping_add(row[i - colors]);
            }
        }
    }
    Ok(output)
}

fn decode_png(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    let row_len = params.pixel_bytes_per_row();
    let bpp = params.bytes_per_pixel();
    let mut output = Vec::with_capacity(data.len());
    let mut prev_row = vec![0u8; row_len];

    for (row_idx, chunk) in data.chunks(row_len + 1).enumerate() {
        let tag = chunk[0];
        let encoded = &chunk[1..];
        let filter = PngPredictor::from_tag(tag).ok_or_else(|| {
            Error::filter(
                "Predictor",
                row_idx * (row_len + 1),
                format!("invalid PNG filter tag {}", tag),
            )
        })?;

        // A short final row is decoded as far as it goes
        let mut row = vec![0u8; encoded.len()];
        for i in 0..encoded.len() {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = prev_row[i];
            let up_left = if i >= bpp { prev_row[i - bpp] } else { 0 };
            row[i] = encoded[i].wrapping_add(predict(filter, left, up, up_left));
        }
        output.extend_from_slice(&row);
        prev_row[..row.len()].copy_from_slice(&row);
    }

    Ok(output)
}

fn encode_png(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    let row_len = params.pixel_bytes_per_row();
    let bpp = params.bytes_per_pixel();
    let filter = PngPredictor::for_predictor(params.predictor);
    let mut output = Vec::with_capacity(data.len() + data.len() / row_len.max(1) + 1);
    let mut prev_row = vec![0u8; row_len];

    for row in data.chunks(row_len) {
        output.push(filter as u8);
        for i in 0..row.len() {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = prev_row[i];
            let up_left = if i >= bpp { prev_row[i - bpp] } else { 0 };
            output.push(row[i].wrapping_sub(predict(filter, left, up, up_left)));
        }
        prev_row[..row.len()].copy_from_slice(row);
    }

    Ok(output)
}

fn predict(filter: PngPredictor, left: u8, up: u8, up_left: u8) -> u8 {
    match filter {
        PngPredictor::None => 0,
        PngPredictor::Sub => left,
        PngPredictor::Up => up,
        PngPredictor::Average => ((left as u16 + up as u16) / 2) as u8,
        PngPredictor::Paeth => paeth_predictor(left as i16, up as i16, up_left as i16) as u8,
    }
}

/// Paeth predictor function from the PNG specification.
fn paeth_predictor(a: i16, b: i16, c: i16) -> i16 {
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();

    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(predictor: i64, columns: usize, colors: usize) -> DecodeParams {
        DecodeParams {
            predictor,
            columns,
            colors,
            ..Default::default()
        }
    }

    #[test]
    fn test_no_predictor() {
        let data = b"Hello, World!";
        assert_eq!(decode_predictor(data, &params(1, 1, 1)).unwrap(), data);
    }

    #[test]
    fn test_png_up_predictor() {
        let encoded = vec![
            2, 10, 20, 30, 40, 50, // Row 0: tag + [10, 20, 30, 40, 50]
            2, 5, 5, 5, 5, 5, // Row 1: [15, 25, 35, 45, 55] decoded
        ];
        let result = decode_predictor(&encoded, &params(12, 5, 1)).unwrap();
        assert_eq!(result, vec![10, 20, 30, 40, 50, 15, 25, 35, 45, 55]);
    }

    #[test]
    fn test_png_row_tags_override_predictor_value() {
        // /Predictor 15 and /Predictor 12 both honor per-row tags
        let encoded = vec![1, 1, 1, 1, 0, 9, 9, 9];
        for p in [12, 15] {
            assert_eq!(decode_predictor(&encoded, &params(p, 3, 1)).unwrap(), vec![1, 2, 3, 9, 9, 9]);
        }
    }

    #[test]
    fn test_png_encode_roundtrip_all_filters() {
        let data: Vec<u8> = (0..60u8).map(|i| i.wrapping_mul(37)).collect();
        for predictor in 10..=15 {
            let p = params(predictor, 5, 3);
            let encoded = encode_predictor(&data, &p).unwrap();
            assert_eq!(decode_predictor(&encoded, &p).unwrap(), data, "predictor {}", predictor);
        }
    }

    #[test]
    fn test_png_encode_scenario_bytes() {
        let p = params(12, 4, 1);
        let encoded = encode_predictor(&[0, 1, 2, 3, 4, 5, 6, 7], &p).unwrap();
        assert_eq!(encoded, vec![2, 0, 1, 2, 3, 2, 4, 4, 4, 4]);
    }

    #[test]
    fn test_tiff_predictor_roundtrip() {
        let p = params(2, 4, 2);
        let data = vec![10, 100, 12, 90, 15, 80, 15, 70];
        let encoded = encode_predictor(&data, &p).unwrap();
        assert_eq!(&encoded[..4], &[10, 100, 2, 246]);
        assert_eq!(decode_predictor(&encoded, &p).unwrap(), data);
    }

    #[test]
    fn test_invalid_png_tag() {
        assert!(decode_predictor(&[7, 1, 2], &params(12, 2, 1)).is_err());
    }

    #[test]
    fn test_bytes_per_row_calculation() {
        let p = params(12, 5, 1);
        assert_eq!(p.pixel_bytes_per_row(), 5);
        let sixteen = DecodeParams {
            bits_per_component: 16,
            ..params(12, 2, 3)
        };
        assert_eq!(sixteen.bytes_per_pixel(), 6);
    }
}
