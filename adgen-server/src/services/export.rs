//! JPEG export optimization.
//!
//! Images already under the target are re-encoded at high quality. Larger
//! images step quality down until they fit, falling back to a 1080px-wide
//! resize.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use crate::error::ServiceError;

/// Quality for images already under target.
pub const HIGH_QUALITY: u8 = 95;
/// Starting quality for the size search.
pub const START_QUALITY: u8 = 90;
/// Quality floor; the search stops at or below it.
pub const MIN_QUALITY: u8 = 10;
/// Maximum encode attempts in the size search.
pub const MAX_ITERATIONS: usize = 10;
/// Width of the last-resort resize.
pub const FALLBACK_WIDTH: u32 = 1080;
/// Quality of the last-resort encode.
pub const FALLBACK_QUALITY: u8 = 50;

/// Quality for the next attempt: coarse steps while far over target.
#[must_use]
pub fn next_quality(quality: u8, size: usize, limit: usize) -> u8 {
    let step = if size > limit.saturating_mul(2) { 20 } else { 10 };
    quality.saturating_sub(step)
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, ServiceError> {
    let rgb = image.to_rgb8();
    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, quality).encode_image(&rgb)?;
    Ok(buffer.into_inner())
}

fn resize_to_width(image: &DynamicImage, width: u32) -> DynamicImage {
    let source_width = u64::from(image.width().max(1));
    let height = (u64::from(image.height()) * u64::from(width) / source_width).max(1);
    let height = u32::try_from(height).unwrap_or(u32::MAX);
    image.resize_exact(width, height, FilterType::Triangle)
}

/// Optimize an encoded image into a JPEG of at most `max_kb` kilobytes where
/// possible.
///
/// # Errors
///
/// Returns [`ServiceError::Image`] if an oversized input cannot be decoded or
/// re-encoded.
pub fn optimize_for_export(input: &[u8], max_kb: usize) -> Result<Vec<u8>, ServiceError> {
    let limit = max_kb.saturating_mul(1024);

    if input.len() <= limit {
        return match image::load_from_memory(input) {
            Ok(decoded) => encode_jpeg(&decoded, HIGH_QUALITY),
            Err(e) => {
                tracing::debug!(error = %e, "undecodable small image returned as-is");
                Ok(input.to_vec())
            }
        };
    }

    let decoded = image::load_from_memory(input)?;
    let mut output = input.to_vec();
    let mut quality = START_QUALITY;
    let mut iterations = 0;
    while output.len() > limit && quality > MIN_QUALITY && iterations < MAX_ITERATIONS {
        output = encode_jpeg(&decoded, quality)?;
        tracing::debug!(quality, bytes = output.len(), "export attempt");
        quality = next_quality(quality, output.len(), limit);
        iterations += 1;
    }

    if output.len() > limit {
        let resized = resize_to_width(&decoded, FALLBACK_WIDTH);
        output = encode_jpeg(&resized, FALLBACK_QUALITY)?;
        tracing::debug!(bytes = output.len(), "export fell back to resize");
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    fn png_bytes(image: &RgbImage) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, ImageFormat::Png)
            .expect("encode png");
        buffer.into_inner()
    }

    fn noise(width: u32, height: u32) -> RgbImage {
        // xorshift keeps the noise deterministic without a rand dependency
        let mut state: u32 = 0x9E37_79B9;
        RgbImage::from_fn(width, height, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            Rgb([r, g, b])
        })
    }

    fn is_jpeg(bytes: &[u8]) -> bool {
        bytes.starts_with(&[0xFF, 0xD8])
    }

    #[test]
    fn test_quality_schedule() {
        assert_eq!(next_quality(90, 3000, 1000), 70);
        assert_eq!(next_quality(90, 2000, 1000), 80);
        assert_eq!(next_quality(10, 5000, 1000), 0);
    }

    #[test]
    fn test_small_image_reencoded_as_jpeg() {
        let png = png_bytes(&RgbImage::from_pixel(64, 64, Rgb([200, 30, 30])));
        let out = optimize_for_export(&png, 500).expect("optimize");
        assert!(is_jpeg(&out));
    }

    #[test]
    fn test_small_undecodable_returned_unchanged() {
        let junk = b"not an image".to_vec();
        assert_eq!(optimize_for_export(&junk, 500).expect("optimize"), junk);
    }

    #[test]
    fn test_large_undecodable_is_error() {
        let junk = vec![7u8; 4096];
        assert!(matches!(
            optimize_for_export(&junk, 1),
            Err(ServiceError::Image(_))
        ));
    }

    #[test]
    fn test_oversized_image_shrinks() {
        let png = png_bytes(&noise(400, 300));
        assert!(png.len() > 100 * 1024);
        let out = optimize_for_export(&png, 100).expect("optimize");
        assert!(is_jpeg(&out));
        assert!(out.len() <= 100 * 1024);
    }

    #[test]
    fn test_resize_keeps_aspect() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(2160, 1080));
        let resized = resize_to_width(&image, FALLBACK_WIDTH);
        assert_eq!((resized.width(), resized.height()), (1080, 540));
    }
}
