//! Joining several tensors into one.

use ndarray::{ArrayD, ArrayViewD, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::shape::{resolve_axis, TensorShape};

/// Concatenates inputs along `axis`; negative axes count from the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concatenate {
    pub axis: isize,
}

impl Default for Concatenate {
    fn default() -> Self {
        Self { axis: -1 }
    }
}

impl Concatenate {
    #[must_use]
    pub const fn new(axis: isize) -> Self {
        Self { axis }
    }

    /// Checks that there are at least two inputs and that they agree on
    /// every dimension except the concatenation axis.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompatibleInput`] naming the first offending input,
    /// or [`Error::InvalidAxis`] if the axis does not exist.
    pub fn check_input_shapes(&self, inputs: &[TensorShape]) -> Result<()> {
        let [first, rest @ ..] = inputs else {
            return Err(too_few(inputs.len()));
        };
        if rest.is_empty() {
            return Err(too_few(1));
        }
        resolve_axis(self.axis, first.rank())?;

        for (offset, shape) in rest.iter().enumerate() {
            if !first.almost_equal(shape, self.axis)? {
                return Err(Error::IncompatibleInput {
                    index: offset + 1,
                    axis: self.axis,
                    first: first.to_string(),
                    actual: shape.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Shape of the concatenation: the axis dimension is the sum of the
    /// inputs', unknown if any of them is unknown.
    ///
    /// # Errors
    ///
    /// Returns the error from [`Self::check_input_shapes`].
    pub fn output_shape(&self, inputs: &[TensorShape]) -> Result<TensorShape> {
        self.check_input_shapes(inputs)?;
        let first = &inputs[0];
        let axis = resolve_axis(self.axis, first.rank())?;

        let mut summed = Some(0usize);
        for shape in inputs {
            summed = match (summed, shape.dims()[axis]) {
                (Some(acc), Some(d)) => Some(acc.checked_add(d).ok_or_else(|| {
                    Error::ShapeMismatch {
                        expected: format!("concatenated axis {axis} to fit in usize"),
                        actual: format!("{acc} + {d}"),
                    }
                })?),
                _ => None,
            };
        }
        let dims = (0..first.rank())
            .map(|i| inputs.iter().find_map(|shape| shape.dims()[i]))
            .collect();
        Ok(TensorShape::new(dims).with_dim(axis, summed))
    }

    /// Concatenates the arrays along the resolved axis.
    ///
    /// # Errors
    ///
    /// Returns the error from [`Self::check_input_shapes`].
    pub fn apply(&self, inputs: &[ArrayViewD<'_, f32>]) -> Result<ArrayD<f32>> {
        let shapes: Vec<TensorShape> = inputs
            .iter()
            .map(|a| TensorShape::known(a.shape()))
            .collect();
        self.check_input_shapes(&shapes)?;
        let axis = resolve_axis(self.axis, shapes[0].rank())?;

        ndarray::concatenate(Axis(axis), inputs).map_err(|err| Error::ShapeMismatch {
            expected: format!("inputs concatenable along axis {axis}"),
            actual: err.to_string(),
        })
    }
}

fn too_few(count: usize) -> Error {
    Error::invalid(
        "inputs",
        format!("concatenation needs at least 2 inputs, got {count}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, IxDyn};

    #[test]
    fn test_last_axis_shape_and_data_agree() {
        let a = Array3::from_shape_fn((2, 3, 3), |(y, x, c)| (y * 100 + x * 10 + c) as f32)
            .into_dyn();
        let b = Array3::from_elem((2, 3, 1), -1.0f32).into_dyn();
        let op = Concatenate::new(-1);

        let shape = op
            .output_shape(&[TensorShape::known(a.shape()), TensorShape::known(b.shape())])
            .unwrap();
        let out = op.apply(&[a.view(), b.view()]).unwrap();

        assert_eq!(shape, TensorShape::known(&[2, 3, 4]));
        assert_eq!(TensorShape::known(out.shape()), shape);
        assert_eq!(out[IxDyn(&[1, 2, 2])], 122.0);
        assert_eq!(out[IxDyn(&[1, 2, 3])], -1.0);
    }

    #[test]
    fn test_unknown_dims() {
        let op = Concatenate::new(0);
        let shape = op
            .output_shape(&[
                TensorShape::new(vec![Some(2), None]),
                TensorShape::new(vec![Some(3), Some(5)]),
            ])
            .unwrap();
        assert_eq!(shape, TensorShape::known(&[5, 5]));

        let shape = op
            .output_shape(&[
                TensorShape::new(vec![None, Some(5)]),
                TensorShape::new(vec![Some(3), Some(5)]),
            ])
            .unwrap();
        assert_eq!(shape, TensorShape::new(vec![None, Some(5)]));
    }

    #[test]
    fn test_incompatible_input_names_index() {
        let op = Concatenate::new(-1);
        let err = op
            .check_input_shapes(&[
                TensorShape::known(&[2, 2, 3]),
                TensorShape::known(&[2, 2, 1]),
                TensorShape::known(&[2, 4, 1]),
            ])
            .unwrap_err();
        assert!(matches!(err, Error::IncompatibleInput { index: 2, .. }));
        let message = err.to_string();
        assert!(message.contains("[2, 2, 3]"));
        assert!(message.contains("[2, 4, 1]"));
    }

    #[test]
    fn test_axis_sum_overflow() {
        let op = Concatenate::new(0);
        let big = TensorShape::known(&[usize::MAX, 2]);
        assert!(matches!(
            op.output_shape(&[big.clone(), big]),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_needs_two_inputs() {
        let op = Concatenate::default();
        assert!(op.check_input_shapes(&[]).is_err());
        assert!(op.check_input_shapes(&[TensorShape::known(&[1])]).is_err());
    }

    #[test]
    fn test_axis_out_of_range() {
        let op = Concatenate::new(3);
        assert!(matches!(
            op.check_input_shapes(&[
                TensorShape::known(&[1, 1, 1]),
                TensorShape::known(&[1, 1, 1]),
            ]),
            Err(Error::InvalidAxis { axis: 3, rank: 3 })
        ));
    }
}
