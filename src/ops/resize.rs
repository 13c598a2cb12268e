//! Resize to a fixed output size.

use ndarray::{Array3, ArrayView3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::image::Image;
use crate::shape::ImageShape;

use super::{ImageOperation, Interpolation};

/// Resamples the pixel grid to `width` x `height`.
///
/// Both modes use pixel-center mapping, so values never leave the range of
/// the source samples and the channel bounds carry over unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resize {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub interpolation: Interpolation,
}

impl Resize {
    #[must_use]
    pub const fn new(width: u32, height: u32, interpolation: Interpolation) -> Self {
        Self {
            width,
            height,
            interpolation,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::invalid(
                "resize",
                format!(
                    "target size must be positive, got {}x{}",
                    self.width, self.height
                ),
            ));
        }
        Ok(())
    }
}

impl ImageOperation for Resize {
    fn name(&self) -> &'static str {
        "resize"
    }

    fn output_shape(&self, input: ImageShape) -> Result<ImageShape> {
        self.validate()?;
        Ok(input.with_width(self.width).with_height(self.height))
    }

    fn apply(&self, image: Image) -> Result<Image> {
        self.validate()?;
        if image.width() == self.width && image.height() == self.height {
            return Ok(image);
        }
        if image.data().is_empty() {
            return Err(Error::invalid(
                "resize",
                format!("cannot sample from an empty image ({})", image.shape()),
            ));
        }
        let (dst_h, dst_w) = (self.height as usize, self.width as usize);
        let resized = match self.interpolation {
            Interpolation::Nearest => resize_nearest(image.data(), dst_w, dst_h),
            Interpolation::Bilinear => resize_bilinear(image.data(), dst_w, dst_h),
        };
        image.with_data(resized)
    }
}

/// Source coordinate of a destination pixel center.
#[inline]
#[allow(clippy::cast_precision_loss)]
fn src_coord(dst: usize, src_len: usize, dst_len: usize) -> f32 {
    let scale = src_len as f32 / dst_len as f32;
    (dst as f32 + 0.5) * scale - 0.5
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn resize_nearest(src: ArrayView3<'_, f32>, dst_w: usize, dst_h: usize) -> Array3<f32> {
    let (src_h, src_w, channels) = src.dim();
    let nearest = |dst: usize, src_len: usize, dst_len: usize| -> usize {
        // Pixel-center mapping: round the center coordinate, clamp to the grid
        let pos = src_coord(dst, src_len, dst_len).round().max(0.0) as usize;
        pos.min(src_len - 1)
    };
    let xs: Vec<usize> = (0..dst_w).map(|x| nearest(x, src_w, dst_w)).collect();
    let ys: Vec<usize> = (0..dst_h).map(|y| nearest(y, src_h, dst_h)).collect();

    Array3::from_shape_fn((dst_h, dst_w, channels), |(y, x, c)| src[[ys[y], xs[x], c]])
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn resize_bilinear(src: ArrayView3<'_, f32>, dst_w: usize, dst_h: usize) -> Array3<f32> {
    let (src_h, src_w, channels) = src.dim();
    let taps = |dst: usize, src_len: usize, dst_len: usize| -> (usize, usize, f32) {
        let pos = src_coord(dst, src_len, dst_len).clamp(0.0, (src_len - 1) as f32);
        let i0 = pos.floor() as usize;
        let i1 = (i0 + 1).min(src_len - 1);
        (i0, i1, pos - i0 as f32)
    };
    let xs: Vec<_> = (0..dst_w).map(|x| taps(x, src_w, dst_w)).collect();
    let ys: Vec<_> = (0..dst_h).map(|y| taps(y, src_h, dst_h)).collect();

    Array3::from_shape_fn((dst_h, dst_w, channels), |(y, x, c)| {
        let (y0, y1, fy) = ys[y];
        let (x0, x1, fx) = xs[x];
        let top = src[[y0, x0, c]] * (1.0 - fx) + src[[y0, x1, c]] * fx;
        let bottom = src[[y1, x0, c]] * (1.0 - fx) + src[[y1, x1, c]] * fx;
        top * (1.0 - fy) + bottom * fy
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ColorMode;
    use crate::ops::test_util::gradient;

    #[test]
    fn test_zero_target_rejected() {
        let op = Resize::new(0, 4, Interpolation::Nearest);
        assert!(matches!(
            op.output_shape(ImageShape::unknown()),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(op.apply(gradient(2, 2)).is_err());
    }

    #[test]
    fn test_shape_keeps_channels() {
        let op = Resize::new(64, 32, Interpolation::Bilinear);
        let shape = op
            .output_shape(ImageShape::unknown().with_channels(3))
            .unwrap();
        assert_eq!(shape, ImageShape::new(64, 32, 3));
    }

    #[test]
    fn test_nearest_downscale_by_two() {
        let image = gradient(4, 4);
        let out = Resize::new(2, 2, Interpolation::Nearest).apply(image).unwrap();
        // centers of destination pixels 0 and 1 map to 0.5 and 2.5, rounded away from zero
        assert_eq!(out.data()[[0, 0, 0]], 110.0);
        assert_eq!(out.data()[[1, 1, 0]], 330.0);
    }

    #[test]
    fn test_nearest_upscale_repeats() {
        let image = gradient(2, 1);
        let out = Resize::new(4, 1, Interpolation::Nearest).apply(image).unwrap();
        let row: Vec<f32> = (0..4).map(|x| out.data()[[0, x, 0]]).collect();
        assert_eq!(row, vec![0.0, 0.0, 10.0, 10.0]);
    }

    #[test]
    fn test_bilinear_stays_in_range() {
        let image = gradient(5, 3);
        let out = Resize::new(11, 7, Interpolation::Bilinear).apply(image).unwrap();
        let max = out.data().iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let min = out.data().iter().copied().fold(f32::INFINITY, f32::min);
        assert!(min >= 0.0);
        assert!(max <= 242.0);
    }

    #[test]
    fn test_bilinear_constant_image() {
        let mut image = Image::zeros(3, 3, ColorMode::Grayscale);
        image.data_mut().fill(0.5);
        let out = Resize::new(8, 5, Interpolation::Bilinear).apply(image).unwrap();
        assert!(out.data().iter().all(|&v| (v - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_empty_source_rejected() {
        for interpolation in [Interpolation::Nearest, Interpolation::Bilinear] {
            let op = Resize::new(2, 2, interpolation);
            for (w, h) in [(0, 4), (4, 0)] {
                assert!(matches!(
                    op.apply(Image::zeros(w, h, ColorMode::Rgb)),
                    Err(Error::InvalidParameter { .. })
                ));
            }
        }
    }
}
