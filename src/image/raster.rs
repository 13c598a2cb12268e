//! Raster-style element access over an image array.
//!
//! Rasters address samples as `(x, y, band)` or by a flat element index in
//! pixel-interleaved order. These views translate both into the array's
//! `(y, x, c)` indexing while borrowing the array, never copying it.

use ndarray::{ArrayView1, ArrayView3, ArrayViewMut3};

/// Read-only raster adapter.
#[derive(Debug, Clone, Copy)]
pub struct RasterView<'a> {
    array: ArrayView3<'a, f32>,
}

/// Read-write raster adapter.
#[derive(Debug)]
pub struct RasterViewMut<'a> {
    array: ArrayViewMut3<'a, f32>,
}

/// Splits a flat interleaved index into `(y, x, c)`.
#[inline]
const fn unwrap_index(i: usize, width: usize, bands: usize) -> (usize, usize, usize) {
    let pixel = i / bands;
    (pixel / width, pixel % width, i % bands)
}

/// Inverse of [`unwrap_index`].
#[inline]
const fn wrap_index(y: usize, x: usize, c: usize, width: usize, bands: usize) -> usize {
    (x + y * width) * bands + c
}

impl<'a> RasterView<'a> {
    pub(crate) const fn new(array: ArrayView3<'a, f32>) -> Self {
        Self { array }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.array.dim().1
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.array.dim().0
    }

    #[must_use]
    pub fn num_bands(&self) -> usize {
        self.array.dim().2
    }

    /// Total number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.array.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    /// Sample of `band` at pixel `(x, y)`.
    #[must_use]
    pub fn sample(&self, x: usize, y: usize, band: usize) -> f32 {
        self.array[[y, x, band]]
    }

    /// All bands of pixel `(x, y)`.
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> ArrayView1<'a, f32> {
        self.array.slice_move(ndarray::s![y, x, ..])
    }

    /// Sample at a flat interleaved index.
    #[must_use]
    pub fn elem(&self, i: usize) -> f32 {
        let (y, x, c) = unwrap_index(i, self.width(), self.num_bands());
        self.array[[y, x, c]]
    }

    /// Flat interleaved index of `(x, y, band)`.
    #[must_use]
    pub fn index_of(&self, x: usize, y: usize, band: usize) -> usize {
        wrap_index(y, x, band, self.width(), self.num_bands())
    }
}

impl<'a> RasterViewMut<'a> {
    pub(crate) const fn new(array: ArrayViewMut3<'a, f32>) -> Self {
        Self { array }
    }

    /// Reborrows as a read-only view.
    #[must_use]
    pub fn view(&self) -> RasterView<'_> {
        RasterView::new(self.array.view())
    }

    pub fn set_sample(&mut self, x: usize, y: usize, band: usize, value: f32) {
        self.array[[y, x, band]] = value;
    }

    /// Writes all bands of pixel `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `values` does not hold exactly one value per band, or the
    /// pixel is outside the raster.
    pub fn set_pixel(&mut self, x: usize, y: usize, values: &[f32]) {
        let bands = self.array.dim().2;
        assert_eq!(
            values.len(),
            bands,
            "pixel needs {bands} values, got {}",
            values.len()
        );
        for (band, &value) in values.iter().enumerate() {
            self.array[[y, x, band]] = value;
        }
    }

    pub fn set_elem(&mut self, i: usize, value: f32) {
        let (width, bands) = (self.array.dim().1, self.array.dim().2);
        let (y, x, c) = unwrap_index(i, width, bands);
        self.array[[y, x, c]] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_index_round_trip() {
        for i in 0..(4 * 5 * 3) {
            let (y, x, c) = unwrap_index(i, 5, 3);
            assert!(y < 4 && x < 5 && c < 3);
            assert_eq!(wrap_index(y, x, c, 5, 3), i);
        }
    }

    #[test]
    fn test_flat_index_matches_array_order() {
        let array =
            Array3::<f32>::from_shape_fn((2, 3, 3), |(y, x, c)| (y * 100 + x * 10 + c) as f32);
        let view = RasterView::new(array.view());
        for (i, value) in array.iter().enumerate() {
            assert_eq!(view.elem(i), *value);
        }
        assert_eq!(view.sample(2, 1, 0), 120.0);
        assert_eq!(view.index_of(2, 1, 0), 15);
        assert_eq!(view.pixel(1, 0).to_vec(), vec![10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_writes_reach_array() {
        let mut array = Array3::<f32>::zeros((2, 2, 1));
        {
            let mut view = RasterViewMut::new(array.view_mut());
            view.set_sample(1, 0, 0, 3.0);
            view.set_elem(2, 5.0);
            assert_eq!(view.view().sample(0, 1, 0), 5.0);
        }
        assert_eq!(array[[0, 1, 0]], 3.0);
        assert_eq!(array[[1, 0, 0]], 5.0);
    }

    #[test]
    fn test_set_pixel_writes_every_band() {
        let mut array = Array3::<f32>::zeros((2, 3, 3));
        {
            let mut view = RasterViewMut::new(array.view_mut());
            view.set_pixel(2, 1, &[0.25, 0.5, 0.75]);
            assert_eq!(view.view().pixel(2, 1).to_vec(), vec![0.25, 0.5, 0.75]);
        }
        assert_eq!(array[[1, 2, 0]], 0.25);
        assert_eq!(array[[1, 2, 2]], 0.75);
        assert_eq!(array.iter().filter(|&&v| v != 0.0).count(), 3);
    }

    #[test]
    #[should_panic(expected = "pixel needs 3 values")]
    fn test_set_pixel_rejects_wrong_band_count() {
        let mut array = Array3::<f32>::zeros((1, 1, 3));
        RasterViewMut::new(array.view_mut()).set_pixel(0, 0, &[1.0]);
    }
}
