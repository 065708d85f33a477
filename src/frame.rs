//! Image normalization.
//!
//! Decodes uploaded bytes, applies the EXIF orientation so that "upright"
//! means the same thing for every photo, and records the frame dimensions.

use exif::{In, Tag};
use image::{DynamicImage, RgbaImage};
use std::io::Cursor;
use tracing::debug;

use crate::error::ExtractError;

/// EXIF orientation tag values (TIFF 6.0, tag 0x0112).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Upright,
    FlipHorizontal,
    Rotate180,
    FlipVertical,
    Transpose,
    Rotate90,
    Transverse,
    Rotate270,
}

impl Orientation {
    /// Maps the raw tag value; anything outside 1..=8 is treated as upright.
    pub fn from_exif(value: u32) -> Self {
        match value {
            2 => Orientation::FlipHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::FlipVertical,
            5 => Orientation::Transpose,
            6 => Orientation::Rotate90,
            7 => Orientation::Transverse,
            8 => Orientation::Rotate270,
            _ => Orientation::Upright,
        }
    }

    /// Returns the image as it should be displayed.
    pub fn apply(self, img: DynamicImage) -> DynamicImage {
        match self {
            Orientation::Upright => img,
            Orientation::FlipHorizontal => img.fliph(),
            Orientation::Rotate180 => img.rotate180(),
            Orientation::FlipVertical => img.flipv(),
            Orientation::Transpose => img.rotate90().fliph(),
            Orientation::Rotate90 => img.rotate90(),
            Orientation::Transverse => img.rotate270().fliph(),
            Orientation::Rotate270 => img.rotate270(),
        }
    }
}

/// A decoded photo in display orientation. Owned by one extraction.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub image: RgbaImage,
    /// Orientation that was declared by the file and already applied
    pub orientation: Orientation,
    pub width: u32,
    pub height: u32,
}

/// Reads the EXIF orientation tag, if the container carries one.
pub fn read_orientation(bytes: &[u8]) -> Option<Orientation> {
    let mut cursor = Cursor::new(bytes);
    let exif = exif::Reader::new().read_from_container(&mut cursor).ok()?;
    let field = exif.get_field(Tag::Orientation, In::PRIMARY)?;
    field.value.get_uint(0).map(Orientation::from_exif)
}

/// Decodes `bytes` into an upright `RawFrame`.
///
/// Fails with `MissingInput` for an empty buffer and `Decode` when the bytes
/// are not an image; neither case is retried.
pub fn normalize(bytes: &[u8]) -> Result<RawFrame, ExtractError> {
    if bytes.is_empty() {
        return Err(ExtractError::MissingInput);
    }

    let decoded = image::load_from_memory(bytes)?;
    let orientation = read_orientation(bytes).unwrap_or_default();
    let upright = orientation.apply(decoded);
    let image = upright.to_rgba8();

    // Decoded dimensions are authoritative once orientation is applied
    let (width, height) = image.dimensions();

    debug!(
        "Normalized frame: {}x{} (orientation {:?})",
        width, height, orientation
    );

    Ok(RawFrame {
        image,
        orientation,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgba};

    fn encode_png(img: RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_normalize_png_without_exif() {
        let img: RgbaImage = ImageBuffer::from_pixel(40, 20, Rgba([10, 20, 30, 255]));
        let frame = normalize(&encode_png(img)).unwrap();

        assert_eq!((frame.width, frame.height), (40, 20));
        assert_eq!(frame.orientation, Orientation::Upright);
        assert_eq!(frame.image.get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_frame_dimensions_match_decoded_image() {
        let img: RgbaImage = ImageBuffer::from_pixel(7, 31, Rgba([0, 0, 0, 255]));
        let frame = normalize(&encode_png(img)).unwrap();
        assert_eq!((frame.width, frame.height), frame.image.dimensions());
        assert_eq!((frame.width, frame.height), (7, 31));
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        let err = normalize(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ExtractError::Decode(_)));
    }

    #[test]
    fn test_normalize_empty_is_missing_input() {
        let err = normalize(&[]).unwrap_err();
        assert!(matches!(err, ExtractError::MissingInput));
    }

    #[test]
    fn test_orientation_from_exif() {
        assert_eq!(Orientation::from_exif(1), Orientation::Upright);
        assert_eq!(Orientation::from_exif(6), Orientation::Rotate90);
        assert_eq!(Orientation::from_exif(8), Orientation::Rotate270);
        assert_eq!(Orientation::from_exif(0), Orientation::Upright);
        assert_eq!(Orientation::from_exif(42), Orientation::Upright);
    }

    #[test]
    fn test_orientation_apply_rotates_dimensions() {
        // 4x2 image with a marker in the top-left corner
        let mut img: RgbaImage = ImageBuffer::from_pixel(4, 2, Rgba([255, 255, 255, 255]));
        img.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        let img = DynamicImage::ImageRgba8(img);

        let rotated = Orientation::Rotate90.apply(img.clone()).to_rgba8();
        assert_eq!(rotated.dimensions(), (2, 4));
        // Clockwise quarter turn moves top-left to top-right
        assert_eq!(rotated.get_pixel(1, 0)[0], 0);

        let flipped = Orientation::FlipHorizontal.apply(img.clone()).to_rgba8();
        assert_eq!(flipped.dimensions(), (4, 2));
        assert_eq!(flipped.get_pixel(3, 0)[0], 0);

        let transposed = Orientation::Transpose.apply(img).to_rgba8();
        assert_eq!(transposed.dimensions(), (2, 4));
        assert_eq!(transposed.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_read_orientation_absent_for_png() {
        let img: RgbaImage = ImageBuffer::new(2, 2);
        assert_eq!(read_orientation(&encode_png(img)), None);
    }
}
