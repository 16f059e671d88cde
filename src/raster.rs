//! Canonical raster form for embedded page images
//!
//! Whatever the asset's on-disk encoding, a decoded page becomes 8-bit RGB
//! samples compressed with FlateDecode, plus a FlateDecode gray soft mask when
//! the image carries real transparency. Both encodings are lossless.

use image::DynamicImage;
use lopdf::{Dictionary, Object, Stream};
use std::io::Write;

/// A decoded page normalized for embedding
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    /// Zlib-compressed RGB samples
    rgb: Vec<u8>,
    /// Zlib-compressed alpha samples, if the image has transparency
    alpha: Option<Vec<u8>>,
}

impl RasterImage {
    /// Normalize a decoded image
    pub fn from_image(img: &DynamicImage) -> Result<Self, String> {
        let width = img.width();
        let height = img.height();
        if width == 0 || height == 0 {
            return Err(format!("Image has no pixels ({}x{})", width, height));
        }

        if has_alpha(img) {
            let rgba = img.to_rgba8();
            let raw_data = rgba.into_raw();

            // Separate RGB and Alpha channels
            let mut rgb_data = Vec::with_capacity((width * height * 3) as usize);
            let mut alpha_data = Vec::with_capacity((width * height) as usize);
            for chunk in raw_data.chunks(4) {
                rgb_data.extend_from_slice(&chunk[..3]);
                alpha_data.push(chunk[3]);
            }

            Ok(RasterImage {
                width,
                height,
                rgb: deflate(&rgb_data)?,
                alpha: Some(deflate(&alpha_data)?),
            })
        } else {
            let rgb = img.to_rgb8();
            Ok(RasterImage {
                width,
                height,
                rgb: deflate(rgb.as_raw())?,
                alpha: None,
            })
        }
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha.is_some()
    }

    /// Image XObject for the color samples, without the SMask link
    pub fn color_stream(&self) -> Stream {
        image_stream(self.width, self.height, "DeviceRGB", self.rgb.clone())
    }

    /// Image XObject for the soft mask, if any
    pub fn mask_stream(&self) -> Option<Stream> {
        self.alpha
            .as_ref()
            .map(|alpha| image_stream(self.width, self.height, "DeviceGray", alpha.clone()))
    }
}

fn image_stream(width: u32, height: u32, color_space: &str, data: Vec<u8>) -> Stream {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(color_space.as_bytes().to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    dict.set("Length", Object::Integer(data.len() as i64));

    // already compressed; keep Document::compress from touching it again
    Stream::new(dict, data).with_compression(false)
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, String> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::best());
    encoder
        .write_all(data)
        .map_err(|e| format!("Failed to compress raster data: {}", e))?;
    encoder
        .finish()
        .map_err(|e| format!("Failed to finish compression: {}", e))
}

/// Check if an image has meaningful alpha
fn has_alpha(img: &DynamicImage) -> bool {
    match img {
        DynamicImage::ImageRgba8(rgba) => {
            let sample_rate = std::cmp::max(1, rgba.pixels().len() / 10000);
            rgba.pixels().step_by(sample_rate).any(|p| p.0[3] < 255)
        }
        DynamicImage::ImageLumaA8(la) => {
            let sample_rate = std::cmp::max(1, la.pixels().len() / 10000);
            la.pixels().step_by(sample_rate).any(|p| p.0[1] < 255)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::ZlibDecoder;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Read;

    fn inflate(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        ZlibDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn opaque_images_become_flate_rgb() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, Rgb([10, 20, 30])));
        let raster = RasterImage::from_image(&img).unwrap();

        assert!(!raster.has_alpha());
        assert!(raster.mask_stream().is_none());

        let stream = raster.color_stream();
        assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 4);
        assert_eq!(stream.dict.get(b"Height").unwrap().as_i64().unwrap(), 3);
        assert_eq!(stream.dict.get(b"Filter").unwrap().as_name().unwrap(), b"FlateDecode");

        let samples = inflate(&stream.content);
        assert_eq!(samples.len(), 4 * 3 * 3);
        assert_eq!(&samples[..3], &[10, 20, 30]);
    }

    #[test]
    fn opaque_rgba_has_no_mask() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255])));
        let raster = RasterImage::from_image(&img).unwrap();
        assert!(!raster.has_alpha());
    }

    #[test]
    fn transparency_is_kept_as_a_soft_mask() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([200, 100, 50, 128])));
        let raster = RasterImage::from_image(&img).unwrap();

        let mask = raster.mask_stream().expect("soft mask");
        assert_eq!(mask.dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceGray");
        assert_eq!(inflate(&mask.content), vec![128; 4]);
        assert_eq!(inflate(&raster.color_stream().content)[..3], [200, 100, 50]);
    }
}
