//! Decode and encode boundaries of the pipeline.
//!
//! All inputs are normalized to 3-channel RGB at decode time; the annotated
//! output is always JPEG. Keeping both conversions here means no other stage
//! ever sees an unexpected color mode.

use image::{codecs::jpeg::JpegEncoder, RgbImage};

use crate::pipeline::error::PipelineError;

/// Default JPEG quality for annotated output.
pub const JPEG_QUALITY: u8 = 85;

/// Decode raw bytes into an RGB raster.
///
/// Any alpha channel or non-RGB color mode is flattened here so downstream
/// stages and the JPEG encoder only deal with 3-channel images.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    let image = image::load_from_memory(bytes).map_err(PipelineError::Decode)?;
    Ok(image.to_rgb8())
}

/// Encode an RGB raster as JPEG.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, PipelineError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .encode_image(image)
        .map_err(PipelineError::Encode)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn decode_rejects_garbage_bytes() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));
    }

    #[test]
    fn decode_normalizes_to_rgb() {
        // Encode an RGBA PNG, decode it back; alpha must be flattened.
        let rgba = image::RgbaImage::from_pixel(8, 8, image::Rgba([10, 20, 30, 128]));
        let mut png = Vec::new();
        image::DynamicImage::ImageRgba8(rgba)
            .write_to(
                &mut std::io::Cursor::new(&mut png),
                image::ImageFormat::Png,
            )
            .unwrap();

        let decoded = decode_image(&png).unwrap();
        assert_eq!(decoded.dimensions(), (8, 8));
    }

    #[test]
    fn jpeg_round_trip_preserves_dimensions() {
        let image = RgbImage::from_pixel(33, 17, Rgb([200, 50, 25]));
        let jpeg = encode_jpeg(&image, JPEG_QUALITY).unwrap();
        let decoded = decode_image(&jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (33, 17));
    }
}
