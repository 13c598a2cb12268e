//! Model files and inference on preprocessed buffers.

mod hub;
mod onnx;

pub use hub::ModelHub;
pub use onnx::{input_tensor, OnnxModel};
