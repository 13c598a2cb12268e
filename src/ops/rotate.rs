//! Rotation about the image center.

use ndarray::{Array3, ArrayView3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::image::Image;
use crate::shape::ImageShape;

use super::{ImageOperation, Interpolation};

/// Tolerance for samples that land a rounding error outside the grid.
const EDGE_EPSILON: f32 = 1e-4;

/// Rotates the pixel grid clockwise by `degrees` about the image center.
///
/// The output keeps the input size: corners rotated out of frame are clipped
/// and uncovered areas are filled with zero. Quarter turns of square images
/// are exact permutations of the input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotate {
    pub degrees: f32,
    #[serde(default)]
    pub interpolation: Interpolation,
}

impl Rotate {
    #[must_use]
    pub const fn new(degrees: f32) -> Self {
        Self {
            degrees,
            interpolation: Interpolation::Bilinear,
        }
    }

    #[must_use]
    pub const fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    fn validate(&self) -> Result<()> {
        if !self.degrees.is_finite() {
            return Err(Error::invalid(
                "rotate",
                format!("angle must be finite, got {}", self.degrees),
            ));
        }
        Ok(())
    }

    /// `(cos, sin)` of the angle, exact for multiples of 90 degrees.
    #[allow(clippy::cast_possible_truncation)]
    fn cos_sin(&self) -> (f32, f32) {
        let turns = f64::from(self.degrees) / 90.0;
        if (turns - turns.round()).abs() < 1e-9 {
            return match (turns.round() as i64).rem_euclid(4) {
                0 => (1.0, 0.0),
                1 => (0.0, 1.0),
                2 => (-1.0, 0.0),
                _ => (0.0, -1.0),
            };
        }
        let radians = f64::from(self.degrees).to_radians();
        (radians.cos() as f32, radians.sin() as f32)
    }
}

impl ImageOperation for Rotate {
    fn name(&self) -> &'static str {
        "rotate"
    }

    fn output_shape(&self, input: ImageShape) -> Result<ImageShape> {
        self.validate()?;
        Ok(input)
    }

    fn apply(&self, image: Image) -> Result<Image> {
        self.validate()?;
        let (cos, sin) = self.cos_sin();
        if (cos, sin) == (1.0, 0.0) || image.data().is_empty() {
            return Ok(image);
        }

        let (rotated, filled) = rotate(image.data(), cos, sin, self.interpolation);
        let mut result = image.with_data(rotated)?;
        if filled {
            let (min, max) = result.bounds_mut();
            min.iter_mut().for_each(|m| *m = m.min(0.0));
            max.iter_mut().for_each(|m| *m = m.max(0.0));
        }
        Ok(result)
    }
}

/// Inverse-maps every destination pixel into the source.
///
/// Returns the rotated array and whether any pixel fell outside the source.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn rotate(
    src: ArrayView3<'_, f32>,
    cos: f32,
    sin: f32,
    interpolation: Interpolation,
) -> (Array3<f32>, bool) {
    let (h, w, channels) = src.dim();
    let (max_x, max_y) = ((w - 1) as f32, (h - 1) as f32);
    let (cx, cy) = (max_x / 2.0, max_y / 2.0);
    let mut filled = false;

    let rotated = Array3::from_shape_fn((h, w, channels), |(y, x, c)| {
        let (dx, dy) = (x as f32 - cx, y as f32 - cy);
        let sx = cos.mul_add(dx, sin * dy) + cx;
        let sy = (-sin).mul_add(dx, cos * dy) + cy;

        let inside = (-EDGE_EPSILON..=max_x + EDGE_EPSILON).contains(&sx)
            && (-EDGE_EPSILON..=max_y + EDGE_EPSILON).contains(&sy);
        if !inside {
            filled = true;
            return 0.0;
        }
        let (sx, sy) = (sx.clamp(0.0, max_x), sy.clamp(0.0, max_y));

        match interpolation {
            Interpolation::Nearest => src[[sy.round() as usize, sx.round() as usize, c]],
            Interpolation::Bilinear => {
                let (x0, y0) = (sx.floor() as usize, sy.floor() as usize);
                let (x1, y1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1));
                let (fx, fy) = (sx - x0 as f32, sy - y0 as f32);
                let top = src[[y0, x0, c]] * (1.0 - fx) + src[[y0, x1, c]] * fx;
                let bottom = src[[y1, x0, c]] * (1.0 - fx) + src[[y1, x1, c]] * fx;
                top * (1.0 - fy) + bottom * fy
            }
        }
    });

    (rotated, filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::test_util::gradient;

    #[test]
    fn test_non_finite_rejected() {
        assert!(Rotate::new(f32::INFINITY)
            .output_shape(ImageShape::unknown())
            .is_err());
        assert!(matches!(
            Rotate::new(f32::NAN).apply(gradient(2, 2)),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_quarter_turn_clockwise() {
        let image = gradient(3, 3);
        let out = Rotate::new(90.0).apply(image).unwrap();
        // the bottom-left pixel moves to the top-left corner
        assert_eq!(out.data()[[0, 0, 0]], 200.0);
        assert_eq!(out.data()[[0, 2, 0]], 0.0);
        assert_eq!(out.data()[[2, 2, 0]], 20.0);
        assert_eq!(out.data()[[1, 1, 1]], 111.0);
    }

    #[test]
    fn test_full_turns_are_identity() {
        let image = gradient(4, 3);
        for degrees in [0.0, 360.0, -720.0] {
            let out = Rotate::new(degrees).apply(image.clone()).unwrap();
            assert_eq!(out, image);
        }
    }

    #[test]
    fn test_four_quarter_turns_restore_square() {
        let image = gradient(5, 5);
        let mut out = image.clone();
        for _ in 0..4 {
            out = Rotate::new(-90.0)
                .with_interpolation(Interpolation::Nearest)
                .apply(out)
                .unwrap();
        }
        assert_eq!(out.data(), image.data());
    }

    #[test]
    fn test_arbitrary_angle_keeps_shape_and_fills() {
        let image = gradient(8, 6);
        let out = Rotate::new(45.0).apply(image).unwrap();
        assert_eq!(out.shape(), ImageShape::new(8, 6, 3));
        // corners come from outside the source
        assert_eq!(out.data()[[0, 0, 0]], 0.0);
    }
}
