//! # prepix
//!
//! Image preprocessing pipelines for deep-learning models.
//!
//! A [`Pipeline`] decodes an image, runs a fixed sequence of geometric and
//! numeric operations on it and flattens the result into an `f32` buffer in
//! the layout a model expects. The output shape can be computed from the
//! configuration alone, before any file is read.
//!
//! ## Example
//!
//! ```no_run
//! use prepix::ops::{Interpolation, Load, TensorLayout};
//! use prepix::{ColorMode, ImageShape, Pipeline};
//!
//! # fn main() -> prepix::Result<()> {
//! let pipeline = Pipeline::builder()
//!     .load(Load::new().with_color_mode(ColorMode::Bgr))
//!     .resize(224, 224, Interpolation::Bilinear)
//!     .rescale(255.0)
//!     .layout(TensorLayout::ChannelsFirst)
//!     .build()?;
//!
//! assert_eq!(
//!     pipeline.final_shape(ImageShape::unknown())?,
//!     ImageShape::new(224, 224, 3)
//! );
//! let out = pipeline.apply_file("cat.jpg")?;
//! assert_eq!(out.data.len(), 3 * 224 * 224);
//! # Ok(())
//! # }
//! ```

pub mod dataset;
pub mod error;
pub mod image;
pub mod merge;
pub mod model;
pub mod ops;
pub mod pipeline;
pub mod shape;

pub use crate::error::{Error, Result};
pub use crate::image::{ColorMode, Image};
pub use crate::pipeline::{Pipeline, PipelineBuilder, PipelineConfig, Preprocessed};
pub use crate::shape::{ImageShape, TensorShape};
