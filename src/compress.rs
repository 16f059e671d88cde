//! Asset preparation
//!
//! Scans come off the scanner as large PNGs. Before they are published they
//! are shrunk to a bounded width and re-encoded as JPEG, which is what the
//! catalog's asset paths point at.

use crate::CompressError;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};

/// Options for asset compression
#[derive(Debug, Clone)]
pub struct CompressOptions {
    /// JPEG quality (1-100)
    pub quality: u8,
    /// Wider images are downscaled to this width
    pub max_width: u32,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            quality: 85,
            max_width: 1200,
        }
    }
}

/// A re-encoded asset
#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub bytes: Vec<u8>,
    pub original_width: u32,
    pub original_height: u32,
    pub width: u32,
    pub height: u32,
}

impl CompressedImage {
    pub fn was_resized(&self) -> bool {
        (self.width, self.height) != (self.original_width, self.original_height)
    }
}

/// Target size for an image that may exceed `max_width`
pub fn bounded_size(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width > max_width {
        let ratio = max_width as f64 / width as f64;
        let new_height = ((height as f64 * ratio) as u32).max(1);
        (max_width, new_height)
    } else {
        (width, height)
    }
}

/// Composite any transparency over a white background
fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (src, dst) in rgba.pixels().zip(out.pixels_mut()) {
        let [r, g, b, a] = src.0;
        let blend = |c: u8| -> u8 {
            let a = a as u32;
            ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8
        };
        *dst = Rgb([blend(r), blend(g), blend(b)]);
    }
    out
}

/// Downscale, flatten and JPEG-encode one image
pub fn compress_image(bytes: &[u8], options: &CompressOptions) -> Result<CompressedImage, CompressError> {
    if options.quality == 0 || options.quality > 100 {
        return Err(CompressError::InvalidQuality);
    }

    let img = image::load_from_memory(bytes).map_err(|e| CompressError::Decode(e.to_string()))?;
    let (original_width, original_height) = (img.width(), img.height());

    let (width, height) = bounded_size(original_width, original_height, options.max_width);
    let img = if (width, height) != (original_width, original_height) {
        tracing::debug!(
            "Resized: {}x{} -> {}x{}",
            original_width,
            original_height,
            width,
            height
        );
        img.resize_exact(width, height, FilterType::Lanczos3)
    } else {
        img
    };

    let rgb = flatten_on_white(&img);
    if rgb.width() > u16::MAX as u32 || rgb.height() > u16::MAX as u32 {
        return Err(CompressError::Encode(format!(
            "{}x{} exceeds the JPEG size limit",
            rgb.width(),
            rgb.height()
        )));
    }

    let mut jpeg_bytes = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut jpeg_bytes, options.quality);
    encoder.set_progressive(true);
    encoder
        .encode(
            rgb.as_raw(),
            rgb.width() as u16,
            rgb.height() as u16,
            jpeg_encoder::ColorType::Rgb,
        )
        .map_err(|e| CompressError::Encode(e.to_string()))?;

    Ok(CompressedImage {
        bytes: jpeg_bytes,
        original_width,
        original_height,
        width: rgb.width(),
        height: rgb.height(),
    })
}

/// Totals for a batch of compressed files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompressSummary {
    pub found: usize,
    pub succeeded: usize,
    pub original_bytes: u64,
    pub compressed_bytes: u64,
}

impl CompressSummary {
    /// Percentage of the original size saved, if anything was processed
    pub fn savings_percent(&self) -> Option<f64> {
        if self.original_bytes == 0 {
            return None;
        }
        Some((1.0 - self.compressed_bytes as f64 / self.original_bytes as f64) * 100.0)
    }
}

/// Human-readable size in kilobytes, e.g. `124.5 KB`
pub fn format_kb(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

/// Human-readable size in megabytes, e.g. `18.2 MB`
pub fn format_mb(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode_png(img: DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    #[test]
    fn wide_images_are_bounded() {
        assert_eq!(bounded_size(2400, 3000, 1200), (1200, 1500));
        assert_eq!(bounded_size(1201, 10, 1200), (1200, 9));
        assert_eq!(bounded_size(800, 3000, 1200), (800, 3000));
    }

    #[test]
    fn compresses_to_jpeg_within_bounds() {
        let png = encode_png(DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 32, Rgb([5, 6, 7]))));
        let options = CompressOptions {
            quality: 85,
            max_width: 16,
        };
        let out = compress_image(&png, &options).unwrap();

        assert!(out.was_resized());
        assert_eq!((out.width, out.height), (16, 8));
        assert_eq!(image::guess_format(&out.bytes).unwrap(), ImageFormat::Jpeg);

        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn transparency_becomes_white() {
        let png = encode_png(DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0]))));
        let out = compress_image(&png, &CompressOptions::default()).unwrap();
        assert!(!out.was_resized());

        let decoded = image::load_from_memory(&out.bytes).unwrap().to_rgb8();
        let px = decoded.get_pixel(4, 4);
        assert!(px.0.iter().all(|&c| c > 245), "{:?}", px);
    }

    #[test]
    fn rejects_bad_quality_and_garbage() {
        let bad_quality = CompressOptions {
            quality: 0,
            ..CompressOptions::default()
        };
        assert!(matches!(compress_image(&[], &bad_quality), Err(CompressError::InvalidQuality)));
        assert!(matches!(
            compress_image(b"nope", &CompressOptions::default()),
            Err(CompressError::Decode(_))
        ));
    }

    #[test]
    fn summary_reports_savings() {
        let summary = CompressSummary {
            found: 2,
            succeeded: 2,
            original_bytes: 4000,
            compressed_bytes: 1000,
        };
        assert_eq!(summary.savings_percent(), Some(75.0));
        assert_eq!(CompressSummary::default().savings_percent(), None);
        assert_eq!(format_kb(127_488), "124.5 KB");
    }
}
