//! Serializable pipeline configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ops::{Load, Operation, TensorLayout, TensorOperation};

use super::Pipeline;

/// Plain-data description of a [`Pipeline`], as stored in JSON.
///
/// ```json
/// {
///   "load": { "color_mode": "bgr", "shape": { "channels": 3 } },
///   "operations": [
///     { "op": "resize", "width": 64, "height": 64, "interpolation": "nearest" },
///     { "op": "rescale", "scaling_coefficient": 255.0 }
///   ],
///   "layout": "channels_first"
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default)]
    pub load: Option<Load>,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub layout: TensorLayout,
    #[serde(default)]
    pub tensor_operations: Vec<TensorOperation>,
    #[serde(default)]
    pub snapshots: Option<PathBuf>,
}

impl PipelineConfig {
    /// Read a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the text is not a valid configuration.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Check the configuration without keeping the resulting pipeline.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error.
    pub fn validate(&self) -> Result<()> {
        self.clone().build().map(drop)
    }

    /// Validate and build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error.
    pub fn build(self) -> Result<Pipeline> {
        let mut builder = Pipeline::builder().layout(self.layout);
        if let Some(load) = self.load {
            builder = builder.load(load);
        }
        if let Some(dir) = self.snapshots {
            builder = builder.snapshots(dir);
        }
        builder = self.operations.into_iter().fold(builder, |b, op| b.push(op));
        self.tensor_operations
            .into_iter()
            .fold(builder, |b, op| b.tensor(op))
            .build()
    }
}

impl TryFrom<PipelineConfig> for Pipeline {
    type Error = Error;

    fn try_from(config: PipelineConfig) -> Result<Self> {
        config.build()
    }
}

impl From<Pipeline> for PipelineConfig {
    fn from(pipeline: Pipeline) -> Self {
        Self {
            load: pipeline.load,
            operations: pipeline.operations,
            layout: pipeline.layout,
            tensor_operations: pipeline.tensor_operations,
            snapshots: pipeline.snapshots,
        }
    }
}
