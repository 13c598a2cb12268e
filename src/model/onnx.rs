//! Running ONNX models on pipeline output.

use std::path::Path;

use ndarray::Array4;
use ort::session::Session;
use ort::value::Tensor;

use crate::error::{Error, Result};
use crate::ops::TensorLayout;
use crate::pipeline::Preprocessed;

/// An ONNX session fed with [`Preprocessed`] buffers as a batch of one.
pub struct OnnxModel {
    name: String,
    session: Session,
}

impl OnnxModel {
    /// Loads a model file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelLoad`] if the session cannot be created.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path.display().to_string();
        tracing::debug!("Loading model {name}");

        let session = Session::builder()
            .map_err(|source| Error::ModelLoad {
                name: name.clone(),
                source,
            })?
            .commit_from_file(path)
            .map_err(|source| Error::ModelLoad {
                name: name.clone(),
                source,
            })?;

        Ok(Self { name, session })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the model and returns its first output, flattened.
    ///
    /// # Errors
    ///
    /// Returns an error if the input shape is unresolved or inference fails.
    pub fn predict(&mut self, input: &Preprocessed) -> Result<Vec<f32>> {
        let tensor =
            Tensor::from_array(input_tensor(input)?).map_err(|source| Error::Inference { source })?;

        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .map_err(|source| Error::Inference { source })?;

        let output = outputs
            .values()
            .next()
            .ok_or_else(|| Error::ShapeMismatch {
                expected: "at least one output".to_string(),
                actual: "no output".to_string(),
            })?;

        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|source| Error::Inference { source })?;
        tracing::debug!("{}: {} output values", self.name, data.len());

        Ok(data.to_vec())
    }
}

/// Batch of one built from a pipeline result: NHWC for channels-last
/// buffers, NCHW for channels-first.
///
/// # Errors
///
/// Returns an error if the shape is unresolved or does not match the buffer.
pub fn input_tensor(input: &Preprocessed) -> Result<Array4<f32>> {
    let shape = input.shape.require_resolved()?;
    let width = shape.width.unwrap_or_default() as usize;
    let height = shape.height.unwrap_or_default() as usize;
    let channels = shape.channels.unwrap_or_default() as usize;

    let dims = match input.layout {
        TensorLayout::ChannelsLast => (1, height, width, channels),
        TensorLayout::ChannelsFirst => (1, channels, height, width),
    };
    Array4::from_shape_vec(dims, input.data.clone()).map_err(|_| Error::ShapeMismatch {
        expected: shape.to_string(),
        actual: format!("{} elements", input.data.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ImageShape;

    fn preprocessed(layout: TensorLayout) -> Preprocessed {
        Preprocessed {
            data: (0..24).map(|v| v as f32).collect(),
            shape: ImageShape::new(4, 2, 3),
            layout,
        }
    }

    #[test]
    fn test_channels_last_is_nhwc() {
        let tensor = input_tensor(&preprocessed(TensorLayout::ChannelsLast)).unwrap();
        assert_eq!(tensor.dim(), (1, 2, 4, 3));
        assert_eq!(tensor[[0, 1, 0, 2]], 14.0);
    }

    #[test]
    fn test_channels_first_is_nchw() {
        let tensor = input_tensor(&preprocessed(TensorLayout::ChannelsFirst)).unwrap();
        assert_eq!(tensor.dim(), (1, 3, 2, 4));
        assert_eq!(tensor[[0, 2, 0, 0]], 16.0);
    }

    #[test]
    fn test_length_mismatch() {
        let mut input = preprocessed(TensorLayout::ChannelsLast);
        input.data.pop();
        assert!(matches!(
            input_tensor(&input),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
