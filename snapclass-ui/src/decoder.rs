//! Image decoding collaborator
//!
//! Raw upload bytes → RGB image with EXIF orientation applied.

use image::{imageops::FilterType, DynamicImage, ImageDecoder as _, ImageFormat, ImageReader, RgbImage};
use std::io::Cursor;
use thiserror::Error;

/// Longest side of the preview stored in the session
pub const PREVIEW_MAX_SIDE: u32 = 640;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("no image data received")]
    Empty,

    #[error("unrecognized or malformed image ({0})")]
    Malformed(#[from] image::ImageError),

    #[error("failed to read image data: {0}")]
    Io(#[from] std::io::Error),
}

pub trait ImageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<RgbImage, DecodeError>;
}

/// Decoder backed by the `image` crate
///
/// Sniffs the format from the content, not the file name.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardImageDecoder;

impl ImageDecoder for StandardImageDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<RgbImage, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }

        let mut decoder = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .into_decoder()?;
        let orientation = decoder.orientation()?;
        let mut image = DynamicImage::from_decoder(decoder)?;
        image.apply_orientation(orientation);

        Ok(image.to_rgb8())
    }
}

/// PNG bytes of a downscaled copy, for redisplay in the page
pub fn encode_preview(image: &RgbImage) -> Result<Vec<u8>, DecodeError> {
    let (width, height) = image.dimensions();
    let mut buffer = Cursor::new(Vec::new());

    if width.max(height) > PREVIEW_MAX_SIDE {
        let preview = DynamicImage::ImageRgb8(image.clone()).resize(
            PREVIEW_MAX_SIDE,
            PREVIEW_MAX_SIDE,
            FilterType::Triangle,
        );
        preview.write_to(&mut buffer, ImageFormat::Png)?;
    } else {
        image.write_to(&mut buffer, ImageFormat::Png)?;
    }

    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbaImage};

    fn png_bytes(image: DynamicImage) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let bytes = png_bytes(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            3,
            2,
            Rgb([10, 20, 30]),
        )));
        let image = StandardImageDecoder.decode(&bytes).unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(2, 1), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_grayscale_converted_to_rgb() {
        let bytes = png_bytes(DynamicImage::ImageLuma8(GrayImage::from_pixel(
            2,
            2,
            Luma([200]),
        )));
        let image = StandardImageDecoder.decode(&bytes).unwrap();
        assert_eq!(image.get_pixel(0, 0), &Rgb([200, 200, 200]));
    }

    #[test]
    fn test_alpha_dropped() {
        let bytes = png_bytes(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            1,
            1,
            image::Rgba([1, 2, 3, 0]),
        )));
        let image = StandardImageDecoder.decode(&bytes).unwrap();
        assert_eq!(image.get_pixel(0, 0), &Rgb([1, 2, 3]));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            StandardImageDecoder.decode(&[]),
            Err(DecodeError::Empty)
        ));
    }

    #[test]
    fn test_garbage_input() {
        let result = StandardImageDecoder.decode(b"definitely not an image");
        assert!(matches!(result, Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_truncated_png() {
        let bytes = png_bytes(DynamicImage::ImageRgb8(RgbImage::new(16, 16)));
        let result = StandardImageDecoder.decode(&bytes[..bytes.len() / 2]);
        assert!(result.is_err());
    }

    #[test]
    fn test_preview_is_downscaled() {
        let image = RgbImage::new(1280, 640);
        let png = encode_preview(&image).unwrap();
        let preview = StandardImageDecoder.decode(&png).unwrap();
        assert_eq!(preview.dimensions(), (640, 320));
    }
}
