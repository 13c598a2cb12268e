//! Preprocessing pipelines.
//!
//! A [`Pipeline`] is built once with [`PipelineBuilder`] and is immutable
//! afterwards. It can report its output shape without touching any pixel
//! data and turns a file or in-memory image into a flat `f32` buffer.

mod config;

pub use config::PipelineConfig;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::image::{load_image, save_image, ColorMode, Image};
use crate::ops::{
    CenterCrop, ConvertColor, Crop, ImageOperation, Interpolation, Load, Operation, Padding,
    Rescale, Resize, Rotate, TensorLayout, TensorOperation,
};
use crate::shape::{self, ImageShape};

/// JPEG quality used when a snapshot path asks for JPEG.
const SNAPSHOT_QUALITY: u8 = 95;

/// Output of a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessed {
    /// Samples in `layout` order.
    pub data: Vec<f32>,
    /// Fully resolved shape of the image the buffer was taken from.
    pub shape: ImageShape,
    pub layout: TensorLayout,
}

/// An ordered, immutable sequence of preprocessing stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "PipelineConfig", into = "PipelineConfig")]
pub struct Pipeline {
    load: Option<Load>,
    operations: Vec<Operation>,
    layout: TensorLayout,
    tensor_operations: Vec<TensorOperation>,
    snapshots: Option<PathBuf>,
}

impl Pipeline {
    /// Start configuring a pipeline.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    #[must_use]
    pub const fn load(&self) -> Option<&Load> {
        self.load.as_ref()
    }

    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    #[must_use]
    pub const fn layout(&self) -> TensorLayout {
        self.layout
    }

    #[must_use]
    pub fn tensor_operations(&self) -> &[TensorOperation] {
        &self.tensor_operations
    }

    /// Shape produced for images matching `hint`, without decoding anything.
    ///
    /// Folds the hint through the load stage and every image operation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedShape`] if width, height or channels is
    /// still unknown afterwards, or the first configuration error of an image
    /// or tensor operation checked against that shape.
    pub fn final_shape(&self, hint: ImageShape) -> Result<ImageShape> {
        let start = match &self.load {
            Some(load) => load.output_shape(hint)?,
            None => hint,
        };
        let shape = shape::resolve(&self.operations, start)?;
        for op in &self.tensor_operations {
            op.validate(shape)?;
        }
        Ok(shape)
    }

    /// Decode `path` and run the pipeline on it.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding or any stage fails.
    pub fn apply_file<P: AsRef<Path>>(&self, path: P) -> Result<Preprocessed> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::invalid(
                "path",
                format!("{} is not a file", path.display()),
            ));
        }

        let image = match &self.load {
            Some(load) => load.decode(path)?,
            None => load_image(path, ColorMode::default())?,
        };
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image");

        self.apply_image(image, name)
    }

    /// Run the image and tensor stages on an in-memory image.
    ///
    /// `name` identifies the image in logs and snapshot file names.
    ///
    /// # Errors
    ///
    /// Returns an error if any stage fails.
    pub fn apply_image(&self, image: Image, name: &str) -> Result<Preprocessed> {
        let mut image = image;
        for (index, op) in self.operations.iter().enumerate() {
            image = op.apply(image)?;
            tracing::debug!("{name}: {} -> {}", op.name(), image.shape());

            if let Some(dir) = &self.snapshots {
                Self::snapshot(dir, name, index + 1, op.name(), &image)?;
            }
        }

        let shape = image.shape();
        let mut data = self.layout.flatten(&image);
        drop(image);

        for op in &self.tensor_operations {
            op.apply(&mut data, shape, self.layout)?;
            tracing::debug!("{name}: tensor {}", op.name());
        }

        Ok(Preprocessed {
            data,
            shape,
            layout: self.layout,
        })
    }

    fn snapshot(dir: &Path, name: &str, index: usize, op: &str, image: &Image) -> Result<()> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{name}_{index:02}_{op}.png"));
        tracing::debug!("Saving snapshot to: {}", path.display());
        save_image(image, path, SNAPSHOT_QUALITY)
    }
}

/// Staged builder for [`Pipeline`].
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    load: Option<Load>,
    operations: Vec<Operation>,
    layout: TensorLayout,
    tensor_operations: Vec<TensorOperation>,
    snapshots: Option<PathBuf>,
}

impl PipelineBuilder {
    /// Decode files with this source configuration.
    #[must_use]
    pub fn load(mut self, load: Load) -> Self {
        self.load = Some(load);
        self
    }

    /// Append an image-stage operation.
    #[must_use]
    pub fn push(mut self, op: impl Into<Operation>) -> Self {
        self.operations.push(op.into());
        self
    }

    #[must_use]
    pub fn resize(self, width: u32, height: u32, interpolation: Interpolation) -> Self {
        self.push(Resize::new(width, height, interpolation))
    }

    #[must_use]
    pub fn center_crop(self, size: i32) -> Self {
        self.push(CenterCrop::new(size))
    }

    #[must_use]
    pub fn pad(self, padding: Padding) -> Self {
        self.push(padding)
    }

    #[must_use]
    pub fn crop(self, crop: Crop) -> Self {
        self.push(crop)
    }

    #[must_use]
    pub fn rescale(self, scaling_coefficient: f32) -> Self {
        self.push(Rescale::new(scaling_coefficient))
    }

    #[must_use]
    pub fn rotate(self, degrees: f32) -> Self {
        self.push(Rotate::new(degrees))
    }

    #[must_use]
    pub fn convert_color(self, target: ColorMode) -> Self {
        self.push(ConvertColor::new(target))
    }

    /// Memory order of the flattened output.
    #[must_use]
    pub const fn layout(mut self, layout: TensorLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Append an operation on the flattened buffer.
    #[must_use]
    pub fn tensor(mut self, op: impl Into<TensorOperation>) -> Self {
        self.tensor_operations.push(op.into());
        self
    }

    /// Save every intermediate image to `dir`.
    #[must_use]
    pub fn snapshots(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshots = Some(dir.into());
        self
    }

    /// Validate the configuration and freeze it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompletePipeline`] if there is neither a load stage
    /// nor an image operation, or the first configuration error found.
    pub fn build(self) -> Result<Pipeline> {
        if self.load.is_none() && self.operations.is_empty() {
            return Err(Error::IncompletePipeline(
                "add a load stage or at least one image operation".to_string(),
            ));
        }
        let mut shape = match &self.load {
            Some(load) => load.output_shape(ImageShape::unknown())?,
            None => ImageShape::unknown(),
        };
        for op in &self.operations {
            shape = op.output_shape(shape)?;
        }
        // Channels are often known here even when the image size is not
        for op in &self.tensor_operations {
            op.validate(shape)?;
        }

        tracing::debug!(
            "Built pipeline: load={}, {} image operations, {} tensor operations",
            self.load.as_ref().map_or("none", Load::name),
            self.operations.len(),
            self.tensor_operations.len()
        );

        Ok(Pipeline {
            load: self.load,
            operations: self.operations,
            layout: self.layout,
            tensor_operations: self.tensor_operations,
            snapshots: self.snapshots,
        })
    }
}
