//! Multi-dimensional images: an `f32` (height, width, channel) array with a
//! color mode and declared per-channel value bounds.

mod load;
mod raster;
mod save;

pub use load::{decode, load_image};
pub use raster::{RasterView, RasterViewMut};
pub use save::save_image;

use std::fmt;

use image::{ImageBuffer, Luma, Rgb};
use ndarray::{Array3, ArrayView3, ArrayViewMut3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::shape::ImageShape;

/// Upper bound of decoded 8-bit samples.
pub const MAX_8BIT: f32 = 255.0;

/// Channel interpretation of an image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Rgb,
    Bgr,
    Grayscale,
}

impl ColorMode {
    /// Number of channels this mode stores.
    #[must_use]
    pub const fn channels(self) -> usize {
        match self {
            Self::Rgb | Self::Bgr => 3,
            Self::Grayscale => 1,
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rgb => "RGB",
            Self::Bgr => "BGR",
            Self::Grayscale => "GRAYSCALE",
        })
    }
}

/// A mutable image backed by a standard-layout `Array3<f32>` of shape
/// (height, width, channels).
///
/// The channel count always equals `color_mode.channels()` and every channel
/// has `channel_min[i] <= channel_max[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    data: Array3<f32>,
    color_mode: ColorMode,
    channel_min: Vec<f32>,
    channel_max: Vec<f32>,
}

impl Image {
    /// Wraps an array, declaring bounds of `[0, 1]` for every channel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if the channel axis does not match the color mode.
    pub fn from_array(data: Array3<f32>, color_mode: ColorMode) -> Result<Self> {
        let channels = color_mode.channels();
        if data.dim().2 != channels {
            return Err(Error::ShapeMismatch {
                expected: format!("{channels} channels for {color_mode}"),
                actual: format!("{} channels", data.dim().2),
            });
        }
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };
        Ok(Self {
            data,
            color_mode,
            channel_min: vec![0.0; channels],
            channel_max: vec![1.0; channels],
        })
    }

    /// A black image.
    #[must_use]
    pub fn zeros(width: u32, height: u32, color_mode: ColorMode) -> Self {
        let channels = color_mode.channels();
        Self {
            data: Array3::zeros((height as usize, width as usize, channels)),
            color_mode,
            channel_min: vec![0.0; channels],
            channel_max: vec![1.0; channels],
        }
    }

    /// Replaces the declared channel bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the lengths are wrong or a minimum
    /// exceeds its maximum.
    pub fn with_bounds(mut self, channel_min: Vec<f32>, channel_max: Vec<f32>) -> Result<Self> {
        let channels = self.channels();
        if channel_min.len() != channels || channel_max.len() != channels {
            return Err(Error::invalid(
                "channel bounds",
                format!("expected {channels} values per bound"),
            ));
        }
        if let Some(i) = (0..channels).find(|&i| channel_min[i] > channel_max[i]) {
            return Err(Error::invalid(
                "channel bounds",
                format!(
                    "channel {i} has min {} above max {}",
                    channel_min[i], channel_max[i]
                ),
            ));
        }
        self.channel_min = channel_min;
        self.channel_max = channel_max;
        Ok(self)
    }

    /// Same geometry and bounds as `self`, new pixel data.
    ///
    /// Used by operations that replace the buffer but keep the color mode.
    pub(crate) fn with_data(&self, data: Array3<f32>) -> Result<Self> {
        Self::from_array(data, self.color_mode)?
            .with_bounds(self.channel_min.clone(), self.channel_max.clone())
    }

    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.data.dim().1 as u32
    }

    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.data.dim().0 as u32
    }

    #[must_use]
    pub fn channels(&self) -> usize {
        self.data.dim().2
    }

    /// Fully known shape of this image.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn shape(&self) -> ImageShape {
        ImageShape::new(self.width(), self.height(), self.channels() as u32)
    }

    #[must_use]
    pub const fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    #[must_use]
    pub fn channel_min(&self) -> &[f32] {
        &self.channel_min
    }

    #[must_use]
    pub fn channel_max(&self) -> &[f32] {
        &self.channel_max
    }

    pub(crate) fn bounds_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        (&mut self.channel_min, &mut self.channel_max)
    }

    #[must_use]
    pub fn data(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// Mutable view of the pixel array; the shape cannot change through it.
    pub fn data_mut(&mut self) -> ArrayViewMut3<'_, f32> {
        self.data.view_mut()
    }

    #[must_use]
    pub fn into_array(self) -> Array3<f32> {
        self.data
    }

    /// Element-level adapter over the pixel array.
    #[must_use]
    pub fn raster(&self) -> RasterView<'_> {
        RasterView::new(self.data.view())
    }

    /// Mutable element-level adapter over the pixel array.
    pub fn raster_mut(&mut self) -> RasterViewMut<'_> {
        RasterViewMut::new(self.data.view_mut())
    }

    /// Borrows a color image as an `image` crate buffer without copying.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] for grayscale images.
    pub fn as_rgb32f(&self) -> Result<ImageBuffer<Rgb<f32>, &[f32]>> {
        self.require_channels(3)?;
        let (width, height) = (self.width(), self.height());
        self.data
            .as_slice()
            .and_then(|buf| ImageBuffer::from_raw(width, height, buf))
            .ok_or_else(|| self.layout_error())
    }

    /// Mutably borrows a color image as an `image` crate buffer, so codecs and
    /// drawing routines write straight into the array.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] for grayscale images.
    pub fn as_rgb32f_mut(&mut self) -> Result<ImageBuffer<Rgb<f32>, &mut [f32]>> {
        self.require_channels(3)?;
        let (width, height) = (self.width(), self.height());
        let err = self.layout_error();
        self.data
            .as_slice_mut()
            .and_then(|buf| ImageBuffer::from_raw(width, height, buf))
            .ok_or(err)
    }

    /// Borrows a grayscale image as an `image` crate buffer without copying.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] for color images.
    pub fn as_luma32f(&self) -> Result<ImageBuffer<Luma<f32>, &[f32]>> {
        self.require_channels(1)?;
        let (width, height) = (self.width(), self.height());
        self.data
            .as_slice()
            .and_then(|buf| ImageBuffer::from_raw(width, height, buf))
            .ok_or_else(|| self.layout_error())
    }

    /// Mutable counterpart of [`Image::as_luma32f`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] for color images.
    pub fn as_luma32f_mut(&mut self) -> Result<ImageBuffer<Luma<f32>, &mut [f32]>> {
        self.require_channels(1)?;
        let (width, height) = (self.width(), self.height());
        let err = self.layout_error();
        self.data
            .as_slice_mut()
            .and_then(|buf| ImageBuffer::from_raw(width, height, buf))
            .ok_or(err)
    }

    fn require_channels(&self, channels: usize) -> Result<()> {
        if self.channels() == channels {
            Ok(())
        } else {
            Err(Error::ShapeMismatch {
                expected: format!("{channels}-channel image"),
                actual: format!("{} image with {} channels", self.color_mode, self.channels()),
            })
        }
    }

    fn layout_error(&self) -> Error {
        Error::ShapeMismatch {
            expected: "contiguous (height, width, channel) buffer".to_string(),
            actual: format!("{:?}", self.data.shape()),
        }
    }
}
