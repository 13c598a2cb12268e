//! Custom error types for prepix.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the prepix library.
#[derive(Error, Debug)]
pub enum Error {
    /// An input file could not be opened or decoded.
    #[error("cannot decode image {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A snapshot could not be encoded or written.
    #[error("cannot write image {path}: {source}")]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A configuration value is out of range. Values are never clamped.
    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Shape folding finished with unknown dimensions.
    #[error(
        "final image shape {shape} is unclear: {missing} unknown. Use an operation with a fixed \
         output size (such as resize) or pass a shape hint with width, height and channels"
    )]
    UnresolvedShape { shape: String, missing: String },

    /// Data or a shape hint disagrees with the expected shape.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// One input of a merge disagrees with the first input outside the merge axis.
    #[error(
        "inputs must match except for axis {axis}: shape of first input is {first} and shape at \
         index {index} is {actual}"
    )]
    IncompatibleInput {
        index: usize,
        axis: isize,
        first: String,
        actual: String,
    },

    /// Axis index outside `-rank..rank`.
    #[error("axis {axis} is out of range for rank {rank}")]
    InvalidAxis { axis: isize, rank: usize },

    /// Crop window does not fit inside the source image.
    #[error(
        "crop window {width}x{height} at ({x}, {y}) does not fit in a \
         {source_width}x{source_height} image"
    )]
    CropOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        source_width: u32,
        source_height: u32,
    },

    /// Color mode conversion that has no defined meaning.
    #[error("unsupported color conversion from {from} to {to}")]
    UnsupportedConversion { from: String, to: String },

    /// Pipeline is missing a stage it needs.
    #[error("incomplete pipeline: {0}")]
    IncompletePipeline(String),

    /// Fetching a model file over HTTP failed.
    #[error("download of {name} failed: {source}")]
    ModelDownload {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    /// The ONNX runtime rejected a model file.
    #[error("cannot open model {name}: {source}")]
    ModelLoad {
        name: String,
        #[source]
        source: ort::Error,
    },

    /// The ONNX runtime failed while running a model.
    #[error("inference failed: {source}")]
    Inference {
        #[source]
        source: ort::Error,
    },

    /// The model cache directory could not be created.
    #[error("cannot create model cache {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a pipeline configuration.
    #[error("invalid pipeline configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for prepix operations.
pub type Result<T> = std::result::Result<T, Error>;
