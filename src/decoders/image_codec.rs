//! Image codec seam for DCT, CCITT, JBIG2 and JPX payloads.
//!
//! The filter pipeline only routes bytes and parameters for these filters.
//! Pixel decoding is delegated to an [`ImageCodec`] supplied by the caller;
//! [`JpegCodec`] covers DCTDecode with the `image` crate.

use crate::error::{Error, Result};
use crate::object::Dictionary;

/// Decoded pixel buffer returned by an image codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Color components per pixel
    pub components: u8,
    /// Bits per component
    pub bits_per_component: u8,
    /// Row-major, tightly packed samples
    pub pixels: Vec<u8>,
}

/// External decoder for image-only filters.
pub trait ImageCodec: Send + Sync {
    /// True if the codec handles `filter` (e.g. "DCTDecode").
    fn supports(&self, filter: &str) -> bool;

    /// Decode `data` for `filter`. `params` merges the image dictionary and
    /// the filter's `/DecodeParms`.
    fn decode(&self, filter: &str, data: &[u8], params: &Dictionary) -> Result<DecodedImage>;
}

/// DCTDecode backend built on the `image` crate's JPEG decoder.
#[derive(Debug, Default, Clone, Copy)]
pub struct JpegCodec;

impl ImageCodec for JpegCodec {
    fn supports(&self, filter: &str) -> bool {
        filter == "DCTDecode"
    }

    fn decode(&self, filter: &str, data: &[u8], _params: &Dictionary) -> Result<DecodedImage> {
        if !self.supports(filter) {
            return Err(Error::Codec(format!("JpegCodec cannot decode {}", filter)));
        }
        let img = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
            .map_err(|e| Error::Codec(format!("JPEG decode failed: {}", e)))?;
        let color = img.color();
        let components = color.channel_count();
        let bits_per_component = (color.bytes_per_pixel() * 8) / components.max(1);
        Ok(DecodedImage {
            width: img.width(),
            height: img.height(),
            components,
            bits_per_component,
            pixels: img.as_bytes().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoders::{FilterPipeline, FilterSpec};
    use std::sync::Arc;

    fn tiny_jpeg() -> Vec<u8> {
        let pixels = vec![200u8; 4 * 4 * 3];
        let mut buf = Vec::new();
        image::codecs::jpeg::JpegEncoder::new(&mut buf)
            .encode(&pixels, 4, 4, image::ColorType::Rgb8)
            .unwrap();
        buf
    }

    #[test]
    fn test_jpeg_codec_decodes_dimensions() {
        let image = JpegCodec.decode("DCTDecode", &tiny_jpeg(), &Dictionary::new()).unwrap();
        assert_eq!((image.width, image.height), (4, 4));
        assert_eq!(image.components, 3);
        assert_eq!(image.bits_per_component, 8);
        assert_eq!(image.pixels.len(), 48);
    }

    #[test]
    fn test_jpeg_codec_rejects_other_filters() {
        assert!(!JpegCodec.supports("JBIG2Decode"));
        assert!(matches!(
            JpegCodec.decode("JBIG2Decode", b"", &Dictionary::new()),
            Err(Error::Codec(_))
        ));
    }

    #[test]
    fn test_pipeline_routes_to_codec() {
        let pipeline = FilterPipeline::default().with_image_codec(Arc::new(JpegCodec));
        let chain = vec![FilterSpec::new("DCTDecode")];
        let outcome = pipeline.decode(&tiny_jpeg(), &chain, true).unwrap();
        assert_eq!(outcome.data.len(), 48);

        let image = pipeline.decode_image(&tiny_jpeg(), &chain, &Dictionary::new()).unwrap();
        assert_eq!(image.width, 4);
    }
}
