//! Shape tracking without pixel data.
//!
//! [`ImageShape`] describes image geometry where any dimension may still be
//! unknown. Shapes are folded forward through a list of operations so callers
//! can size buffers before anything is decoded.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ops::ImageOperation;

/// Rank of an image array laid out as (height, width, channels).
pub const IMAGE_RANK: usize = 3;

/// Width, height and channel count of an image, each possibly unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageShape {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub channels: Option<u32>,
}

impl ImageShape {
    /// A shape with every dimension known.
    #[must_use]
    pub const fn new(width: u32, height: u32, channels: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            channels: Some(channels),
        }
    }

    /// A shape with every dimension unknown.
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            width: None,
            height: None,
            channels: None,
        }
    }

    #[must_use]
    pub const fn with_width(self, width: u32) -> Self {
        Self {
            width: Some(width),
            ..self
        }
    }

    #[must_use]
    pub const fn with_height(self, height: u32) -> Self {
        Self {
            height: Some(height),
            ..self
        }
    }

    #[must_use]
    pub const fn with_channels(self, channels: u32) -> Self {
        Self {
            channels: Some(channels),
            ..self
        }
    }

    /// True when width, height and channels are all known.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.width.is_some() && self.height.is_some() && self.channels.is_some()
    }

    /// Total number of elements, if every dimension is known.
    #[must_use]
    pub fn num_elements(&self) -> Option<usize> {
        Some(self.width? as usize * self.height? as usize * self.channels? as usize)
    }

    /// Dimensions in array order: (height, width, channels).
    #[must_use]
    pub const fn dims(&self) -> [Option<u32>; IMAGE_RANK] {
        [self.height, self.width, self.channels]
    }

    const fn from_dims(dims: [Option<u32>; IMAGE_RANK]) -> Self {
        Self {
            height: dims[0],
            width: dims[1],
            channels: dims[2],
        }
    }

    /// Compares every dimension except `except_axis`, treating unknown as a wildcard.
    ///
    /// Axes follow array order (0 = height, 1 = width, 2 = channels); negative
    /// values count from the end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAxis`] if the axis is out of range.
    pub fn almost_equal(&self, other: &Self, except_axis: isize) -> Result<bool> {
        let axis = resolve_axis(except_axis, IMAGE_RANK)?;
        Ok(self
            .dims()
            .iter()
            .zip(other.dims())
            .enumerate()
            .filter(|(i, _)| *i != axis)
            .all(|(_, (a, b))| dims_match(*a, b)))
    }

    /// Merges two shapes along `axis`.
    ///
    /// Dimensions off the axis take whichever value is known; the axis
    /// dimension is the sum of both, or unknown if either side is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] when the shapes disagree off the axis
    /// or the summed axis does not fit in `u32`.
    pub fn merge(&self, other: &Self, axis: isize) -> Result<Self> {
        if !self.almost_equal(other, axis)? {
            return Err(Error::ShapeMismatch {
                expected: format!("{self} (except axis {axis})"),
                actual: other.to_string(),
            });
        }
        let axis = resolve_axis(axis, IMAGE_RANK)?;
        let (a, b) = (self.dims(), other.dims());
        let mut merged = [None; IMAGE_RANK];
        for i in 0..IMAGE_RANK {
            merged[i] = if i == axis {
                match a[i].zip(b[i]) {
                    Some((x, y)) => Some(x.checked_add(y).ok_or_else(|| {
                        Error::ShapeMismatch {
                            expected: format!("merged axis {axis} to fit in u32"),
                            actual: format!("{x} + {y}"),
                        }
                    })?),
                    None => None,
                }
            } else {
                a[i].or(b[i])
            };
        }
        Ok(Self::from_dims(merged))
    }

    /// Fails unless every dimension is known.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedShape`] naming the unknown dimensions.
    pub fn require_resolved(self) -> Result<Self> {
        if self.is_resolved() {
            return Ok(self);
        }
        let missing: Vec<&str> = [
            ("width", self.width),
            ("height", self.height),
            ("channels", self.channels),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_none())
        .map(|(name, _)| name)
        .collect();
        Err(Error::UnresolvedShape {
            shape: self.to_string(),
            missing: missing.join(", "),
        })
    }
}

impl fmt::Display for ImageShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn dim(v: Option<u32>) -> String {
            v.map_or_else(|| "?".to_string(), |v| v.to_string())
        }
        write!(
            f,
            "ImageShape(width={}, height={}, channels={})",
            dim(self.width),
            dim(self.height),
            dim(self.channels)
        )
    }
}

/// Shape of an N-dimensional tensor; unknown dimensions are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TensorShape {
    dims: Vec<Option<usize>>,
}

impl TensorShape {
    #[must_use]
    pub fn new(dims: Vec<Option<usize>>) -> Self {
        Self { dims }
    }

    /// A fully known shape.
    #[must_use]
    pub fn known(dims: &[usize]) -> Self {
        Self {
            dims: dims.iter().copied().map(Some).collect(),
        }
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    #[must_use]
    pub fn dims(&self) -> &[Option<usize>] {
        &self.dims
    }

    /// Size along `axis`; negative axes count from the end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAxis`] if the axis is out of range.
    pub fn size(&self, axis: isize) -> Result<Option<usize>> {
        Ok(self.dims[resolve_axis(axis, self.rank())?])
    }

    /// Compares every dimension except `except_axis`; unknown matches anything.
    /// Shapes of different rank never match.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAxis`] if the axis is out of range.
    pub fn almost_equal(&self, other: &Self, except_axis: isize) -> Result<bool> {
        if self.rank() != other.rank() {
            return Ok(false);
        }
        let axis = resolve_axis(except_axis, self.rank())?;
        Ok(self
            .dims
            .iter()
            .zip(&other.dims)
            .enumerate()
            .filter(|(i, _)| *i != axis)
            .all(|(_, (a, b))| dims_match(*a, *b)))
    }

    pub(crate) fn with_dim(mut self, axis: usize, size: Option<usize>) -> Self {
        self.dims[axis] = size;
        self
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self
            .dims
            .iter()
            .map(|d| d.map_or_else(|| "?".to_string(), |d| d.to_string()))
            .collect();
        write!(f, "[{}]", dims.join(", "))
    }
}

fn dims_match<T: PartialEq>(a: Option<T>, b: Option<T>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

/// Converts a possibly negative axis into an index in `0..rank`.
///
/// `-1` is the last axis, `-rank` the first.
///
/// # Errors
///
/// Returns [`Error::InvalidAxis`] if the axis is outside `-rank..rank`.
#[allow(clippy::cast_possible_wrap)]
pub fn resolve_axis(axis: isize, rank: usize) -> Result<usize> {
    let resolved = if axis < 0 { axis + rank as isize } else { axis };
    if resolved < 0 || resolved >= rank as isize {
        return Err(Error::InvalidAxis { axis, rank });
    }
    #[allow(clippy::cast_sign_loss)]
    Ok(resolved as usize)
}

/// Folds `initial` through every operation's shape rule.
///
/// # Errors
///
/// Returns the first operation's configuration error, or
/// [`Error::UnresolvedShape`] when a dimension is still unknown at the end.
pub fn resolve<O: ImageOperation>(operations: &[O], initial: ImageShape) -> Result<ImageShape> {
    operations
        .iter()
        .try_fold(initial, |shape, op| op.output_shape(shape))?
        .require_resolved()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_axis() {
        assert_eq!(resolve_axis(-1, 3).unwrap(), 2);
        assert_eq!(resolve_axis(-3, 3).unwrap(), 0);
        assert_eq!(resolve_axis(1, 3).unwrap(), 1);
        assert!(matches!(
            resolve_axis(3, 3),
            Err(Error::InvalidAxis { axis: 3, rank: 3 })
        ));
        assert!(resolve_axis(-4, 3).is_err());
    }

    #[test]
    fn test_almost_equal_wildcard() {
        let a = ImageShape::new(10, 20, 3);
        let b = ImageShape {
            width: Some(10),
            height: None,
            channels: Some(1),
        };
        assert!(a.almost_equal(&b, -1).unwrap());
        assert!(!a.almost_equal(&b, 0).unwrap());
    }

    #[test]
    fn test_merge_sums_axis() {
        let a = ImageShape::new(10, 20, 3);
        let b = ImageShape::new(10, 20, 1);
        assert_eq!(a.merge(&b, -1).unwrap(), ImageShape::new(10, 20, 4));

        let c = ImageShape::new(11, 20, 1);
        assert!(matches!(a.merge(&c, -1), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_merge_axis_overflow() {
        let a = ImageShape::new(1, 1, u32::MAX);
        assert!(matches!(a.merge(&a, -1), Err(Error::ShapeMismatch { .. })));
        let b = ImageShape::new(1, 1, u32::MAX - 1);
        assert_eq!(
            b.merge(&ImageShape::new(1, 1, 1), -1).unwrap(),
            ImageShape::new(1, 1, u32::MAX)
        );
    }

    #[test]
    fn test_merge_keeps_known_fields() {
        let a = ImageShape::unknown().with_width(8);
        let b = ImageShape::unknown().with_height(4).with_channels(2);
        let merged = a.merge(&b, 2).unwrap();
        assert_eq!(merged.width, Some(8));
        assert_eq!(merged.height, Some(4));
        assert_eq!(merged.channels, None);
    }

    #[test]
    fn test_require_resolved_names_missing() {
        let err = ImageShape::unknown()
            .with_channels(3)
            .require_resolved()
            .unwrap_err();
        match err {
            Error::UnresolvedShape { missing, .. } => assert_eq!(missing, "width, height"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_tensor_shape_rank_mismatch() {
        let a = TensorShape::known(&[2, 3]);
        let b = TensorShape::known(&[2, 3, 4]);
        assert!(!a.almost_equal(&b, -1).unwrap());
        assert_eq!(b.size(-1).unwrap(), Some(4));
    }
}
