//! Flattening and operations on the flat tensor.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::image::Image;
use crate::shape::ImageShape;

use super::Rescale;

/// Memory order of the flattened buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensorLayout {
    /// (height, width, channels), pixel-interleaved.
    #[default]
    ChannelsLast,
    /// (channels, height, width), planar.
    ChannelsFirst,
}

impl TensorLayout {
    /// Copies the image into a flat buffer in this layout.
    #[must_use]
    pub fn flatten(self, image: &Image) -> Vec<f32> {
        let data = image.data();
        match self {
            Self::ChannelsLast => data.iter().copied().collect(),
            Self::ChannelsFirst => data.permuted_axes([2, 0, 1]).iter().copied().collect(),
        }
    }

    /// Channel index of element `i` in a buffer of `shape`.
    fn channel_of(self, i: usize, width: usize, height: usize, channels: usize) -> usize {
        match self {
            Self::ChannelsLast => i % channels,
            Self::ChannelsFirst => i / (width * height),
        }
    }
}

/// Per-channel standardization: `(x - mean[c]) / std[c]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalize {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl Normalize {
    #[must_use]
    pub fn new(mean: Vec<f32>, std: Vec<f32>) -> Self {
        Self { mean, std }
    }

    fn validate(&self, channels: usize) -> Result<()> {
        if self.mean.len() != channels || self.std.len() != channels {
            return Err(Error::invalid(
                "normalize",
                format!(
                    "expected {channels} mean and std values, got {} and {}",
                    self.mean.len(),
                    self.std.len()
                ),
            ));
        }
        if let Some(s) = self.std.iter().find(|s| **s == 0.0 || !s.is_finite()) {
            return Err(Error::invalid(
                "normalize",
                format!("std must be finite and non-zero, got {s}"),
            ));
        }
        Ok(())
    }
}

/// An operation on the flattened buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TensorOperation {
    Rescale(Rescale),
    Normalize(Normalize),
}

impl TensorOperation {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Rescale(_) => "rescale",
            Self::Normalize(_) => "normalize",
        }
    }

    /// Checks the configuration against the final image shape.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] on invalid configuration.
    pub fn validate(&self, shape: ImageShape) -> Result<()> {
        match self {
            Self::Rescale(op) => op.validate(),
            Self::Normalize(op) => match shape.channels {
                Some(channels) => op.validate(channels as usize),
                None => Ok(()),
            },
        }
    }

    /// Applies the operation in place.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid configuration or if `data` does not match `shape`.
    pub fn apply(&self, data: &mut [f32], shape: ImageShape, layout: TensorLayout) -> Result<()> {
        let shape = shape.require_resolved()?;
        if shape.num_elements() != Some(data.len()) {
            return Err(Error::ShapeMismatch {
                expected: shape.to_string(),
                actual: format!("{} elements", data.len()),
            });
        }
        self.validate(shape)?;
        match self {
            Self::Rescale(op) => {
                let c = op.scaling_coefficient;
                data.iter_mut().for_each(|v| *v /= c);
            }
            Self::Normalize(op) => {
                let width = shape.width.unwrap_or_default() as usize;
                let height = shape.height.unwrap_or_default() as usize;
                let channels = shape.channels.unwrap_or_default() as usize;
                for (i, v) in data.iter_mut().enumerate() {
                    let c = layout.channel_of(i, width, height, channels);
                    *v = (*v - op.mean[c]) / op.std[c];
                }
            }
        }
        Ok(())
    }
}

impl From<Rescale> for TensorOperation {
    fn from(op: Rescale) -> Self {
        Self::Rescale(op)
    }
}

impl From<Normalize> for TensorOperation {
    fn from(op: Normalize) -> Self {
        Self::Normalize(op)
    }
}
