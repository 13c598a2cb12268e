//! Color order conversion.

use ndarray::{Array3, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::image::{ColorMode, Image};
use crate::shape::ImageShape;

use super::ImageOperation;

/// ITU-R BT.601 luma weights for R, G and B.
const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Converts an image to `target` color mode.
///
/// Supported: identity, RGB ↔ BGR (channel swap), and RGB/BGR → GRAYSCALE
/// (weighted sum). Grayscale cannot be turned back into color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertColor {
    pub target: ColorMode,
}

impl ConvertColor {
    #[must_use]
    pub const fn new(target: ColorMode) -> Self {
        Self { target }
    }
}

impl ImageOperation for ConvertColor {
    fn name(&self) -> &'static str {
        "convert_color"
    }

    #[allow(clippy::cast_possible_truncation)]
    fn output_shape(&self, input: ImageShape) -> Result<ImageShape> {
        // Channel count alone cannot tell RGB from BGR, so only a grayscale
        // input is rejected here
        if input.channels == Some(1) && self.target != ColorMode::Grayscale {
            return Err(unsupported(ColorMode::Grayscale, self.target));
        }
        Ok(input.with_channels(self.target.channels() as u32))
    }

    fn apply(&self, image: Image) -> Result<Image> {
        let from = image.color_mode();
        match (from, self.target) {
            (a, b) if a == b => Ok(image),
            (ColorMode::Rgb, ColorMode::Bgr) | (ColorMode::Bgr, ColorMode::Rgb) => swap(&image),
            (ColorMode::Rgb, ColorMode::Grayscale) => to_gray(&image, LUMA_WEIGHTS),
            (ColorMode::Bgr, ColorMode::Grayscale) => {
                let [r, g, b] = LUMA_WEIGHTS;
                to_gray(&image, [b, g, r])
            }
            (from, to) => Err(unsupported(from, to)),
        }
    }

    fn preserves_color_mode(&self) -> bool {
        false
    }
}

fn unsupported(from: ColorMode, to: ColorMode) -> Error {
    Error::UnsupportedConversion {
        from: from.to_string(),
        to: to.to_string(),
    }
}

fn swap(image: &Image) -> Result<Image> {
    let target = match image.color_mode() {
        ColorMode::Rgb => ColorMode::Bgr,
        _ => ColorMode::Rgb,
    };
    let mut data = image.data().to_owned();
    data.invert_axis(Axis(2));
    let min = image.channel_min().iter().rev().copied().collect();
    let max = image.channel_max().iter().rev().copied().collect();
    Image::from_array(data, target)?.with_bounds(min, max)
}

/// Weighted channel sum; `weights` follow the image's channel order.
fn to_gray(image: &Image, weights: [f32; 3]) -> Result<Image> {
    let src = image.data();
    let (h, w, _) = src.dim();
    let gray = Array3::from_shape_fn((h, w, 1), |(y, x, _)| {
        weights
            .iter()
            .enumerate()
            .map(|(c, wt)| wt * src[[y, x, c]])
            .sum::<f32>()
    });
    let weighted = |bounds: &[f32]| -> f32 { weights.iter().zip(bounds).map(|(w, b)| w * b).sum() };
    let (min, max) = (weighted(image.channel_min()), weighted(image.channel_max()));
    Image::from_array(gray, ColorMode::Grayscale)?.with_bounds(vec![min], vec![max.max(min)])
}
