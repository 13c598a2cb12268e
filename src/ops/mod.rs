//! Image operations.
//!
//! Every operation answers two questions: what shape it produces for a given
//! input shape ([`ImageOperation::output_shape`], no pixel data involved), and
//! how it transforms an actual image ([`ImageOperation::apply`]). For any valid
//! input the two always agree.

mod color;
mod crop;
mod load;
mod padding;
mod rescale;
mod resize;
mod rotate;
mod tensor;

pub use color::ConvertColor;
pub use crop::{CenterCrop, Crop};
pub use load::Load;
pub use padding::{Padding, PaddingMode};
pub use rescale::Rescale;
pub use resize::Resize;
pub use rotate::Rotate;
pub use tensor::{Normalize, TensorLayout, TensorOperation};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::image::Image;
use crate::shape::ImageShape;

/// A configured, stateless image transform.
///
/// Implementations hold only configuration, so one instance can be shared by
/// every thread processing images.
pub trait ImageOperation: Send + Sync {
    /// Short name used in logs and snapshot file names.
    fn name(&self) -> &'static str;

    /// Shape produced for `input`, computed without pixel data.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation is misconfigured.
    fn output_shape(&self, input: ImageShape) -> Result<ImageShape>;

    /// Transforms `image`.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation is misconfigured or cannot handle the image.
    fn apply(&self, image: Image) -> Result<Image>;

    /// Whether the output keeps the input's color mode.
    fn preserves_color_mode(&self) -> bool {
        true
    }
}

/// Sampling used when an operation maps pixels onto a new grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
}

/// Any image-stage operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Resize(Resize),
    CenterCrop(CenterCrop),
    Padding(Padding),
    Crop(Crop),
    Rescale(Rescale),
    Rotate(Rotate),
    ConvertColor(ConvertColor),
}

impl Operation {
    fn inner(&self) -> &dyn ImageOperation {
        match self {
            Self::Resize(op) => op,
            Self::CenterCrop(op) => op,
            Self::Padding(op) => op,
            Self::Crop(op) => op,
            Self::Rescale(op) => op,
            Self::Rotate(op) => op,
            Self::ConvertColor(op) => op,
        }
    }
}

impl ImageOperation for Operation {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn output_shape(&self, input: ImageShape) -> Result<ImageShape> {
        self.inner().output_shape(input)
    }

    fn apply(&self, image: Image) -> Result<Image> {
        self.inner().apply(image)
    }

    fn preserves_color_mode(&self) -> bool {
        self.inner().preserves_color_mode()
    }
}

macro_rules! impl_from_op {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Operation {
                fn from(op: $variant) -> Self {
                    Self::$variant(op)
                }
            }
        )*
    };
}

impl_from_op!(Resize, CenterCrop, Padding, Crop, Rescale, Rotate, ConvertColor);

#[cfg(test)]
pub(crate) mod test_util {
    use ndarray::Array3;

    use crate::image::{ColorMode, Image};

    /// An RGB image whose samples encode their own coordinates.
    pub fn gradient(width: u32, height: u32) -> Image {
        let data = Array3::from_shape_fn((height as usize, width as usize, 3), |(y, x, c)| {
            (y * 100 + x * 10 + c) as f32
        });
        Image::from_array(data, ColorMode::Rgb).unwrap()
    }
}
