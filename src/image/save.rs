//! Encoding images back to 8-bit files.

use std::path::Path;

use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb, RgbImage};

use crate::error::{Error, Result};

use super::{ColorMode, Image};

/// Save an image to disk for inspection.
///
/// The image is:
/// 1. Mapped from its declared channel bounds to [0, 255] with clamping
/// 2. Reordered to RGB if stored as BGR
/// 3. Saved to the specified path (format inferred from extension)
///
/// # Arguments
///
/// * `image` - Image to save
/// * `path` - Output file path
/// * `quality` - JPEG quality (1-100), ignored for other formats
///
/// # Errors
///
/// Returns an error if the image cannot be saved.
pub fn save_image<P: AsRef<Path>>(image: &Image, path: P, quality: u8) -> Result<()> {
    let path = path.as_ref();

    let img = to_dynamic(image);

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("png")
        .to_lowercase();

    match extension.as_str() {
        "jpg" | "jpeg" => {
            let mut output = std::fs::File::create(path)?;
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, quality);
            img.write_with_encoder(encoder)
                .map_err(|source| Error::ImageSave {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
        _ => {
            img.save(path).map_err(|source| Error::ImageSave {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }

    Ok(())
}

/// Convert an image to an 8-bit raster for encoding.
#[allow(clippy::cast_possible_truncation)]
fn to_dynamic(image: &Image) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    let data = image.data();
    let (min, max) = (image.channel_min(), image.channel_max());
    let sample = |x: u32, y: u32, c: usize| -> u8 {
        denormalize(data[[y as usize, x as usize, c]], min[c], max[c])
    };

    match image.color_mode() {
        ColorMode::Grayscale => {
            let img: GrayImage =
                ImageBuffer::from_fn(width, height, |x, y| Luma([sample(x, y, 0)]));
            DynamicImage::ImageLuma8(img)
        }
        ColorMode::Rgb => {
            let img: RgbImage = ImageBuffer::from_fn(width, height, |x, y| {
                Rgb([sample(x, y, 0), sample(x, y, 1), sample(x, y, 2)])
            });
            DynamicImage::ImageRgb8(img)
        }
        ColorMode::Bgr => {
            let img: RgbImage = ImageBuffer::from_fn(width, height, |x, y| {
                Rgb([sample(x, y, 2), sample(x, y, 1), sample(x, y, 0)])
            });
            DynamicImage::ImageRgb8(img)
        }
    }
}

/// Map a value from `[min, max]` to [0, 255] with clamping.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn denormalize(value: f32, min: f32, max: f32) -> u8 {
    let range = max - min;
    if range <= 0.0 {
        return 0;
    }
    let scaled = (value - min) / range * 255.0;
    scaled.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    #[test]
    fn test_denormalize() {
        assert_eq!(denormalize(0.0, 0.0, 1.0), 0);
        assert_eq!(denormalize(0.5, 0.0, 1.0), 128);
        assert_eq!(denormalize(1.0, 0.0, 1.0), 255);
        assert_eq!(denormalize(255.0, 0.0, 255.0), 255);
    }

    #[test]
    fn test_denormalize_clamp() {
        assert_eq!(denormalize(-2.0, 0.0, 1.0), 0);
        assert_eq!(denormalize(2.0, 0.0, 1.0), 255);
        assert_eq!(denormalize(3.0, 1.0, 1.0), 0);
    }

    #[test]
    fn test_bgr_saved_as_rgb() {
        let mut img = Image::zeros(1, 1, ColorMode::Bgr);
        img.data_mut()[[0, 0, 0]] = 1.0;
        match to_dynamic(&img) {
            DynamicImage::ImageRgb8(buf) => assert_eq!(buf.get_pixel(0, 0), &Rgb([0, 0, 255])),
            other => panic!("unexpected buffer {:?}", other.color()),
        }
    }

    #[test]
    fn test_save_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        save_image(&Image::zeros(3, 2, ColorMode::Grayscale), &path, 95).unwrap();
        let reloaded = image::open(&path).unwrap();
        assert_eq!(reloaded.dimensions(), (3, 2));
    }
}
