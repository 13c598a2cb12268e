//! Border padding.

use ndarray::{s, Array3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::image::Image;
use crate::shape::ImageShape;

use super::ImageOperation;

/// How border pixels are filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaddingMode {
    /// Zero in every channel.
    #[default]
    Black,
    /// A constant value in every channel.
    Fill(f32),
    /// Repeat the nearest edge pixel.
    Edge,
}

/// Adds a border of `top`, `bottom`, `left` and `right` pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Padding {
    #[serde(default)]
    pub top: i32,
    #[serde(default)]
    pub bottom: i32,
    #[serde(default)]
    pub left: i32,
    #[serde(default)]
    pub right: i32,
    #[serde(default)]
    pub mode: PaddingMode,
}

impl Padding {
    #[must_use]
    pub const fn new(top: i32, bottom: i32, left: i32, right: i32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
            mode: PaddingMode::Black,
        }
    }

    /// The same amount on every side.
    #[must_use]
    pub const fn uniform(amount: i32) -> Self {
        Self::new(amount, amount, amount, amount)
    }

    #[must_use]
    pub const fn with_mode(mut self, mode: PaddingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Validated amounts as `(top, bottom, left, right)`.
    #[allow(clippy::cast_sign_loss)]
    fn amounts(&self) -> Result<(u32, u32, u32, u32)> {
        let sides = [
            ("top", self.top),
            ("bottom", self.bottom),
            ("left", self.left),
            ("right", self.right),
        ];
        if let Some((side, amount)) = sides.iter().find(|(_, v)| *v < 0) {
            return Err(Error::invalid(
                "padding",
                format!("{side} must not be negative, got {amount}"),
            ));
        }
        if let PaddingMode::Fill(value) = self.mode {
            if !value.is_finite() {
                return Err(Error::invalid("padding", "fill value must be finite"));
            }
        }
        Ok((
            self.top as u32,
            self.bottom as u32,
            self.left as u32,
            self.right as u32,
        ))
    }
}

/// `dim + a + b`, failing instead of wrapping past `u32::MAX`.
fn grow(axis: &str, dim: Option<u32>, a: u32, b: u32) -> Result<Option<u32>> {
    dim.map(|d| {
        d.checked_add(a)
            .and_then(|d| d.checked_add(b))
            .ok_or_else(|| Error::invalid("padding", format!("padded {axis} overflows u32")))
    })
    .transpose()
}

impl ImageOperation for Padding {
    fn name(&self) -> &'static str {
        "padding"
    }

    fn output_shape(&self, input: ImageShape) -> Result<ImageShape> {
        let (top, bottom, left, right) = self.amounts()?;
        Ok(ImageShape {
            width: grow("width", input.width, left, right)?,
            height: grow("height", input.height, top, bottom)?,
            channels: input.channels,
        })
    }

    fn apply(&self, image: Image) -> Result<Image> {
        let (top, bottom, left, right) = self.amounts()?;
        if [top, bottom, left, right] == [0; 4] {
            return Ok(image);
        }
        self.output_shape(image.shape())?;
        let (top, left) = (top as usize, left as usize);
        let (src_h, src_w, channels) = image.data().dim();
        let (dst_h, dst_w) = (src_h + top + bottom as usize, src_w + left + right as usize);

        let fill = match self.mode {
            PaddingMode::Black => Some(0.0),
            PaddingMode::Fill(value) => Some(value),
            PaddingMode::Edge => None,
        };

        let src = image.data();
        let padded = match fill {
            Some(fill) => {
                let mut padded = Array3::from_elem((dst_h, dst_w, channels), fill);
                padded
                    .slice_mut(s![top..top + src_h, left..left + src_w, ..])
                    .assign(&src);
                padded
            }
            None if src.is_empty() => {
                return Err(Error::invalid("padding", "edge mode needs a non-empty image"));
            }
            None => Array3::from_shape_fn((dst_h, dst_w, channels), |(y, x, c)| {
                let sy = y.saturating_sub(top).min(src_h - 1);
                let sx = x.saturating_sub(left).min(src_w - 1);
                src[[sy, sx, c]]
            }),
        };

        let mut result = image.with_data(padded)?;
        if let Some(value) = fill {
            // Widen declared bounds so they still cover the border
            let (min, max) = result.bounds_mut();
            min.iter_mut().for_each(|m| *m = m.min(value));
            max.iter_mut().for_each(|m| *m = m.max(value));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ColorMode;
    use crate::ops::test_util::gradient;

    #[test]
    fn test_negative_rejected() {
        let op = Padding::new(1, -1, 0, 0);
        assert!(matches!(
            op.output_shape(ImageShape::unknown()),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(op.apply(gradient(2, 2)).is_err());
    }

    #[test]
    fn test_shape_rule() {
        let shape = Padding::new(1, 2, 3, 4)
            .output_shape(ImageShape::unknown().with_width(10).with_channels(3))
            .unwrap();
        assert_eq!(shape.width, Some(17));
        assert_eq!(shape.height, None);
        assert_eq!(shape.channels, Some(3));
    }

    #[test]
    fn test_black_border() {
        let image = gradient(2, 2);
        let out = Padding::new(1, 0, 0, 2).apply(image).unwrap();
        assert_eq!(out.shape(), ImageShape::new(4, 3, 3));
        assert_eq!(out.data()[[0, 0, 0]], 0.0);
        assert_eq!(out.data()[[2, 1, 0]], 110.0);
        assert_eq!(out.data()[[2, 3, 1]], 0.0);
    }

    #[test]
    fn test_fill_widens_bounds() {
        let image = Image::zeros(1, 1, ColorMode::Grayscale);
        let out = Padding::uniform(1)
            .with_mode(PaddingMode::Fill(2.0))
            .apply(image)
            .unwrap();
        assert_eq!(out.data()[[0, 0, 0]], 2.0);
        assert_eq!(out.data()[[1, 1, 0]], 0.0);
        assert_eq!(out.channel_max(), &[2.0]);
        assert_eq!(out.channel_min(), &[0.0]);
    }

    #[test]
    fn test_edge_replicates() {
        let image = gradient(2, 2);
        let out = Padding::uniform(1)
            .with_mode(PaddingMode::Edge)
            .apply(image)
            .unwrap();
        assert_eq!(out.data()[[0, 0, 0]], 0.0);
        assert_eq!(out.data()[[3, 3, 0]], 110.0);
        assert_eq!(out.data()[[0, 3, 0]], 10.0);
    }

    #[test]
    fn test_padded_size_overflow_rejected() {
        let op = Padding::new(0, 0, i32::MAX, i32::MAX);
        let input = ImageShape::new(u32::MAX - 10, 1, 3);
        assert!(matches!(
            op.output_shape(input),
            Err(Error::InvalidParameter { .. })
        ));
        assert_eq!(
            op.output_shape(ImageShape::unknown().with_height(4))
                .unwrap()
                .height,
            Some(4)
        );
    }
}
