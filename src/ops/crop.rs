//! Cropping operations.

use ndarray::s;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::image::Image;
use crate::shape::ImageShape;

use super::{ImageOperation, Padding, PaddingMode};

/// Crops a centered `size` x `size` window.
///
/// Images smaller than `size` along either edge are first padded with black,
/// so content is never stretched. A `size` of zero or less disables the crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CenterCrop {
    pub size: i32,
}

impl Default for CenterCrop {
    fn default() -> Self {
        Self { size: -1 }
    }
}

impl CenterCrop {
    #[must_use]
    pub const fn new(size: i32) -> Self {
        Self { size }
    }

    #[allow(clippy::cast_sign_loss)]
    const fn target(&self) -> Option<u32> {
        if self.size > 0 {
            Some(self.size as u32)
        } else {
            None
        }
    }

    #[allow(clippy::cast_possible_wrap)]
    fn pad_if_necessary(size: u32, image: Image) -> Result<Image> {
        if image.width() >= size && image.height() >= size {
            return Ok(image);
        }
        let vertical = size.saturating_sub(image.height()) as i32;
        let horizontal = size.saturating_sub(image.width()) as i32;
        let (top, left) = (vertical / 2, horizontal / 2);
        Padding::new(top, vertical - top, left, horizontal - left)
            .with_mode(PaddingMode::Black)
            .apply(image)
    }
}

impl ImageOperation for CenterCrop {
    fn name(&self) -> &'static str {
        "center_crop"
    }

    fn output_shape(&self, input: ImageShape) -> Result<ImageShape> {
        Ok(match self.target() {
            Some(size) => input.with_width(size).with_height(size),
            None => input,
        })
    }

    fn apply(&self, image: Image) -> Result<Image> {
        let Some(size) = self.target() else {
            return Ok(image);
        };
        if image.width() == size && image.height() == size {
            return Ok(image);
        }

        let padded = Self::pad_if_necessary(size, image)?;
        let x = ((padded.width() - size) / 2) as usize;
        let y = ((padded.height() - size) / 2) as usize;
        let size = size as usize;
        let window = padded.data().slice_move(s![y..y + size, x..x + size, ..]);
        padded.with_data(window.to_owned())
    }
}

/// Removes fixed margins from each side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crop {
    #[serde(default)]
    pub top: u32,
    #[serde(default)]
    pub bottom: u32,
    #[serde(default)]
    pub left: u32,
    #[serde(default)]
    pub right: u32,
}

impl Crop {
    #[must_use]
    pub const fn new(top: u32, bottom: u32, left: u32, right: u32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Window `(x, y, width, height)` kept from a `width` x `height` source.
    fn window(&self, width: u32, height: u32) -> Result<(u32, u32, u32, u32)> {
        let keep_w = width
            .checked_sub(self.left.saturating_add(self.right))
            .filter(|&w| w > 0);
        let keep_h = height
            .checked_sub(self.top.saturating_add(self.bottom))
            .filter(|&h| h > 0);
        match (keep_w, keep_h) {
            (Some(w), Some(h)) => Ok((self.left, self.top, w, h)),
            _ => Err(Error::CropOutOfBounds {
                x: self.left,
                y: self.top,
                width: width.saturating_sub(self.left.saturating_add(self.right)),
                height: height.saturating_sub(self.top.saturating_add(self.bottom)),
                source_width: width,
                source_height: height,
            }),
        }
    }
}

impl ImageOperation for Crop {
    fn name(&self) -> &'static str {
        "crop"
    }

    fn output_shape(&self, input: ImageShape) -> Result<ImageShape> {
        let mut output = input;
        // Both axes are checked together when both are known
        match (input.width, input.height) {
            (Some(w), Some(h)) => {
                let (_, _, w, h) = self.window(w, h)?;
                output.width = Some(w);
                output.height = Some(h);
            }
            (Some(w), None) => {
                let rows = self.top.saturating_add(self.bottom).saturating_add(1);
                output.width = Some(self.window(w, rows)?.2);
            }
            (None, Some(h)) => {
                let cols = self.left.saturating_add(self.right).saturating_add(1);
                output.height = Some(self.window(cols, h)?.3);
            }
            (None, None) => {}
        }
        Ok(output)
    }

    fn apply(&self, image: Image) -> Result<Image> {
        let (x, y, w, h) = self.window(image.width(), image.height())?;
        let (x, y, w, h) = (x as usize, y as usize, w as usize, h as usize);
        let window = image.data().slice_move(s![y..y + h, x..x + w, ..]);
        image.with_data(window.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ColorMode;
    use crate::ops::test_util::gradient;

    #[test]
    fn test_center_crop_disabled_is_identity() {
        let image = gradient(7, 5);
        let out = CenterCrop::default().apply(image.clone()).unwrap();
        assert_eq!(out, image);
        assert_eq!(
            CenterCrop::new(0).output_shape(image.shape()).unwrap(),
            image.shape()
        );
    }

    #[test]
    fn test_center_crop_exact_size_passes_through() {
        let image = gradient(6, 6);
        let out = CenterCrop::new(6).apply(image.clone()).unwrap();
        assert_eq!(out, image);
    }

    #[test]
    fn test_center_crop_takes_middle() {
        let image = gradient(6, 4);
        let out = CenterCrop::new(2).apply(image).unwrap();
        assert_eq!(out.shape(), ImageShape::new(2, 2, 3));
        // x = (6 - 2) / 2 = 2, y = (4 - 2) / 2 = 1
        assert_eq!(out.data()[[0, 0, 0]], 120.0);
        assert_eq!(out.data()[[1, 1, 2]], 232.0);
    }

    #[test]
    fn test_center_crop_pads_small_image() {
        let mut image = Image::zeros(10, 10, ColorMode::Rgb);
        image.data_mut().fill(1.0);
        let out = CenterCrop::new(14).apply(image).unwrap();

        assert_eq!(out.shape(), ImageShape::new(14, 14, 3));
        assert_eq!(out.color_mode(), ColorMode::Rgb);
        for ((y, x, _), &v) in out.data().indexed_iter() {
            let inside = (2..12).contains(&y) && (2..12).contains(&x);
            assert_eq!(v, if inside { 1.0 } else { 0.0 }, "at ({x}, {y})");
        }
    }

    #[test]
    fn test_center_crop_pads_one_axis_only() {
        let image = gradient(3, 8);
        let out = CenterCrop::new(5).apply(image).unwrap();
        assert_eq!(out.shape(), ImageShape::new(5, 5, 3));
        // one column of padding on the left, then original column 0 of row 1
        assert_eq!(out.data()[[0, 0, 0]], 0.0);
        assert_eq!(out.data()[[0, 1, 0]], 100.0);
    }

    #[test]
    fn test_crop_window() {
        let image = gradient(5, 4);
        let out = Crop::new(1, 1, 2, 0).apply(image).unwrap();
        assert_eq!(out.shape(), ImageShape::new(3, 2, 3));
        assert_eq!(out.data()[[0, 0, 0]], 120.0);
    }

    #[test]
    fn test_crop_out_of_bounds() {
        let image = gradient(4, 4);
        let err = Crop::new(0, 0, 2, 2).apply(image).unwrap_err();
        assert!(matches!(err, Error::CropOutOfBounds { .. }));
        assert!(Crop::new(3, 2, 0, 0)
            .output_shape(ImageShape::unknown().with_height(5))
            .is_err());
    }

    #[test]
    fn test_crop_shape_with_unknown_width() {
        let shape = Crop::new(1, 2, 3, 4)
            .output_shape(ImageShape::unknown().with_height(10).with_channels(1))
            .unwrap();
        assert_eq!(shape.height, Some(7));
        assert_eq!(shape.width, None);
    }
}
