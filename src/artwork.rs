//! Cover art normalization.
//!
//! Takes whatever image bytes a tag happened to contain and produces the one
//! canonical form every container accepts: a baseline JPEG, no alpha, at most
//! `target_width` pixels wide.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageEncoder, ImageReader, Rgb, RgbImage};

use crate::config::ProcessOptions;
use crate::errors::{AppError, Result};

/// A cover image after normalization. The payload is always a baseline JPEG
/// (`image/jpeg`), so no MIME field is carried.
#[derive(Debug, Clone)]
pub struct NormalizedCover {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Bits per pixel of the encoded image. Normalization always produces
    /// 3-channel RGB, so this is 24.
    pub depth: u8,
}

/// Normalize raw image bytes into a baseline JPEG.
///
/// - Applies EXIF orientation when present (a missing/unreadable EXIF block is
///   not an error).
/// - Flattens alpha onto an opaque white background, otherwise converts to RGB.
/// - Downscales to `options.target_width` with Lanczos3 when wider; never
///   upscales.
/// - Carries the source ICC profile into the output when the encoder accepts it.
///
/// Output is deterministic for a given input and options, modulo `image` crate
/// version drift in the JPEG encoder.
pub fn normalize_to_jpeg(raw: &[u8], options: &ProcessOptions) -> Result<NormalizedCover> {
    let reader = ImageReader::new(Cursor::new(raw))
        .with_guessed_format()
        .map_err(|e| AppError::Decode(e.to_string()))?;
    let mut decoder = reader
        .into_decoder()
        .map_err(|e| AppError::Decode(e.to_string()))?;

    // Orientation and ICC are best-effort reads off the decoder.
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let icc_profile = decoder.icc_profile().unwrap_or(None);

    let mut img =
        DynamicImage::from_decoder(decoder).map_err(|e| AppError::Decode(e.to_string()))?;
    img.apply_orientation(orientation);

    let rgb = flatten_to_rgb(&img);
    let rgb = downscale(rgb, options.target_width);

    let (width, height) = (rgb.width(), rgb.height());
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, options.jpeg_quality);
    if let Some(profile) = icc_profile {
        // Not all pixel layouts accept a profile; losing it is acceptable.
        let _ = encoder.set_icc_profile(profile);
    }
    encoder
        .encode_image(&rgb)
        .map_err(|e| AppError::Encode(e.to_string()))?;

    Ok(NormalizedCover {
        data: out,
        width,
        height,
        depth: 24,
    })
}

/// Composite alpha onto white, or plain-convert to RGB when no alpha exists.
fn flatten_to_rgb(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    let mut canvas = RgbImage::from_pixel(rgba.width(), rgba.height(), Rgb([255, 255, 255]));
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = pixel[3] as u32;
        let mut out = [0u8; 3];
        for (i, channel) in out.iter_mut().enumerate() {
            let src = pixel[i] as u32;
            // Rounded alpha blend against white.
            *channel = ((src * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        }
        canvas.put_pixel(x, y, Rgb(out));
    }
    canvas
}

/// Downscale to `target_width` preserving aspect ratio. Images at or below the
/// target keep their dimensions untouched.
fn downscale(rgb: RgbImage, target_width: u32) -> RgbImage {
    let (w, h) = (rgb.width(), rgb.height());
    if w <= target_width {
        return rgb;
    }
    let target_height = ((target_width as f64 * h as f64 / w as f64).round() as u32).max(1);
    image::imageops::resize(&rgb, target_width, target_height, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn options() -> ProcessOptions {
        ProcessOptions::default()
    }

    fn encode_png(img: &DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("png encode");
        buf
    }

    #[test]
    fn wide_images_downscale_to_target_width() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1200, 900, Rgb([10, 20, 30])));
        let cover = normalize_to_jpeg(&encode_png(&img), &options()).expect("normalize");
        assert_eq!(cover.width, 600);
        assert_eq!(cover.height, 450);
        assert_eq!(cover.depth, 24);
    }

    #[test]
    fn narrow_images_keep_their_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 500, Rgb([1, 2, 3])));
        let cover = normalize_to_jpeg(&encode_png(&img), &options()).expect("normalize");
        assert_eq!((cover.width, cover.height), (300, 500));
    }

    #[test]
    fn rounded_height_stays_within_one_pixel() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1000, 333, Rgb([0, 0, 0])));
        let cover = normalize_to_jpeg(&encode_png(&img), &options()).expect("normalize");
        assert_eq!(cover.width, 600);
        let expected = (600.0 * 333.0 / 1000.0_f64).round() as u32;
        assert!(cover.height.abs_diff(expected) <= 1);
    }

    #[test]
    fn output_is_decodable_jpeg_without_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 64, Rgba([0, 0, 0, 128])));
        let cover = normalize_to_jpeg(&encode_png(&img), &options()).expect("normalize");

        let decoded = image::load_from_memory_with_format(&cover.data, ImageFormat::Jpeg)
            .expect("decode jpeg");
        assert!(!decoded.color().has_alpha());
        assert_eq!((decoded.width(), decoded.height()), (64, 64));
    }

    #[test]
    fn transparent_pixels_flatten_to_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(32, 32, Rgba([0, 0, 0, 0])));
        let cover = normalize_to_jpeg(&encode_png(&img), &options()).expect("normalize");
        let decoded = image::load_from_memory(&cover.data).expect("decode").to_rgb8();
        let px = decoded.get_pixel(16, 16);
        // JPEG is lossy; near-white is close enough.
        assert!(px[0] > 250 && px[1] > 250 && px[2] > 250, "got {px:?}");
    }

    #[test]
    fn unrecognizable_bytes_fail_with_decode_error() {
        let err = normalize_to_jpeg(b"definitely not an image", &options()).unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }
}
