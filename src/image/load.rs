//! Image decoding utilities.

use std::path::Path;

use image::{DynamicImage, GenericImageView};
use ndarray::Array3;

use crate::error::{Error, Result};

use super::{ColorMode, Image, MAX_8BIT};

/// Load an image from disk in the requested color order.
///
/// Samples keep their 8-bit magnitude (`0..=255`) and the declared channel
/// bounds are `[0, 255]`.
///
/// # Errors
///
/// Returns an error if the file is missing or cannot be decoded.
pub fn load_image<P: AsRef<Path>>(path: P, color_mode: ColorMode) -> Result<Image> {
    let path = path.as_ref();

    let img = image::open(path).map_err(|source| Error::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;

    let (width, height) = img.dimensions();
    tracing::debug!("Decoded {} ({width}x{height})", path.display());

    decode(&img, color_mode)
}

/// Convert a decoded raster into an [`Image`] with the given color order.
///
/// # Errors
///
/// Returns an error if the converted buffer does not match the image geometry.
pub fn decode(img: &DynamicImage, color_mode: ColorMode) -> Result<Image> {
    let (width, height) = img.dimensions();
    let (width, height) = (width as usize, height as usize);
    let channels = color_mode.channels();

    let samples: Vec<f32> = match color_mode {
        ColorMode::Rgb => img.to_rgb8().into_raw().into_iter().map(f32::from).collect(),
        ColorMode::Bgr => img
            .to_rgb8()
            .into_raw()
            .chunks_exact(3)
            .flat_map(|px| [px[2], px[1], px[0]])
            .map(f32::from)
            .collect(),
        ColorMode::Grayscale => img.to_luma8().into_raw().into_iter().map(f32::from).collect(),
    };

    let data = Array3::from_shape_vec((height, width, channels), samples).map_err(|_| {
        Error::ShapeMismatch {
            expected: format!("{height}x{width}x{channels} samples"),
            actual: "decoded buffer of a different size".to_string(),
        }
    })?;

    Image::from_array(data, color_mode)?
        .with_bounds(vec![0.0; channels], vec![MAX_8BIT; channels])
}
