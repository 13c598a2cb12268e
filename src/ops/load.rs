//! Source stage: decoding files into images.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dataset::LabelGenerator;
use crate::error::{Error, Result};
use crate::image::{load_image, ColorMode, Image};
use crate::shape::ImageShape;

/// Decodes image files in a declared color order.
///
/// `shape` is an optional hint: known width/height fix the shape before any
/// file is read and are checked against every decoded image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Load {
    /// File or directory of images, used by dataset loading.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub color_mode: ColorMode,
    #[serde(default)]
    pub shape: ImageShape,
    #[serde(skip)]
    pub labels: Option<Arc<dyn LabelGenerator>>,
}

impl Load {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub const fn with_color_mode(mut self, color_mode: ColorMode) -> Self {
        self.color_mode = color_mode;
        self
    }

    #[must_use]
    pub const fn with_shape(mut self, shape: ImageShape) -> Self {
        self.shape = shape;
        self
    }

    #[must_use]
    pub fn with_labels(mut self, labels: impl LabelGenerator + 'static) -> Self {
        self.labels = Some(Arc::new(labels));
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let channels = self.color_mode.channels();
        match self.shape.channels {
            Some(hint) if hint as usize != channels => Err(Error::invalid(
                "load",
                format!(
                    "shape hint has {hint} channels but {} images have {channels}",
                    self.color_mode
                ),
            )),
            _ => Ok(()),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        "load"
    }

    /// Shape of decoded images: the hint where known, otherwise `input`,
    /// with channels fixed by the color mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the hint's channel count contradicts the color mode.
    #[allow(clippy::cast_possible_truncation)]
    pub fn output_shape(&self, input: ImageShape) -> Result<ImageShape> {
        self.validate()?;
        Ok(ImageShape {
            width: self.shape.width.or(input.width),
            height: self.shape.height.or(input.height),
            channels: Some(self.color_mode.channels() as u32),
        })
    }

    /// Decodes `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be decoded or its size contradicts the hint.
    pub fn decode(&self, path: &Path) -> Result<Image> {
        self.validate()?;
        let image = load_image(path, self.color_mode)?;
        let actual = image.shape();
        if !self.shape.almost_equal(&actual, -1)? {
            return Err(Error::ShapeMismatch {
                expected: self.shape.to_string(),
                actual: format!("{actual} for {}", path.display()),
            });
        }
        Ok(image)
    }

    /// Label of `path` if a label generator is configured.
    #[must_use]
    pub fn label(&self, path: &Path) -> Option<u32> {
        self.labels.as_ref().and_then(|labels| labels.label(path))
    }
}
