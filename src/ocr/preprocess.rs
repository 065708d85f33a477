use image::{GrayImage, ImageBuffer, Luma, Rgba, imageops};
use image::imageops::FilterType;

use crate::config::RelativeRect;

/// Crops a sub-region from an image using relative coordinates.
///
/// Converts the relative rect (0.0–1.0) to absolute pixel coordinates,
/// clamps to image bounds, and returns the cropped sub-image. A rect that
/// falls outside the frame yields an empty (zero-area) image.
pub fn crop_region(
    img: &ImageBuffer<Rgba<u8>, Vec<u8>>,
    region: &RelativeRect,
) -> ImageBuffer<Rgba<u8>, Vec<u8>> {
    let (w, h) = img.dimensions();

    let x0 = ((region.x * w as f32) as u32).min(w);
    let y0 = ((region.y * h as f32) as u32).min(h);
    let rw = ((region.width * w as f32) as u32).min(w - x0);
    let rh = ((region.height * h as f32) as u32).min(h - y0);

    imageops::crop_imm(img, x0, y0, rw, rh).to_image()
}

/// Converts to 8-bit luma.
pub fn to_grayscale(img: &ImageBuffer<Rgba<u8>, Vec<u8>>) -> GrayImage {
    imageops::grayscale(img)
}

/// Stretches the intensity range so the darkest pixel becomes 0 and the
/// brightest 255. Flat images are returned unchanged.
pub fn stretch_contrast(img: &GrayImage) -> GrayImage {
    let (min, max) = img
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));

    if img.width() == 0 || img.height() == 0 || max <= min {
        return img.clone();
    }

    let span = (max - min) as u32;
    let mut output = img.clone();
    for pixel in output.pixels_mut() {
        let v = (pixel[0] - min) as u32;
        pixel[0] = ((v * 255 + span / 2) / span) as u8;
    }
    output
}

/// Enlarges the image to at least `min_width` keeping the aspect ratio.
/// Images already at least that wide are left alone.
pub fn upscale_to_min_width(img: &GrayImage, min_width: u32) -> GrayImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 || w >= min_width {
        return img.clone();
    }

    let scale = min_width as f64 / w as f64;
    let new_h = ((h as f64 * scale).round() as u32).max(1);
    imageops::resize(img, min_width, new_h, FilterType::CatmullRom)
}

/// Converts a grayscale image to pure black and white.
///
/// Pixels at or above `threshold` become white (background), everything
/// darker becomes black (segment digits on the display).
pub fn binarize(img: &GrayImage, threshold: u8) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut output = ImageBuffer::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let value = if pixel[0] >= threshold { 255u8 } else { 0u8 };
        output.put_pixel(x, y, Luma([value]));
    }

    output
}

/// Full preparation for recognition: grayscale, contrast stretch, upscale,
/// binarize. Deterministic for identical input.
pub fn prepare_for_ocr(
    img: &ImageBuffer<Rgba<u8>, Vec<u8>>,
    min_width: u32,
    threshold: u8,
) -> GrayImage {
    let gray = to_grayscale(img);
    let stretched = stretch_contrast(&gray);
    let resized = upscale_to_min_width(&stretched, min_width);
    binarize(&resized, threshold)
}
