use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::image::Image;
use crate::shape::ImageShape;

use super::ImageOperation;

/// Divides every sample by `scaling_coefficient`.
///
/// The declared channel bounds are divided by the same coefficient so they
/// keep describing the data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rescale {
    #[serde(default = "default_coefficient")]
    pub scaling_coefficient: f32,
}

const fn default_coefficient() -> f32 {
    255.0
}

impl Default for Rescale {
    fn default() -> Self {
        Self {
            scaling_coefficient: default_coefficient(),
        }
    }
}

impl Rescale {
    #[must_use]
    pub const fn new(scaling_coefficient: f32) -> Self {
        Self {
            scaling_coefficient,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let c = self.scaling_coefficient;
        if c == 0.0 || !c.is_finite() {
            return Err(Error::invalid(
                "scaling_coefficient",
                format!("must be finite and non-zero, got {c}"),
            ));
        }
        Ok(())
    }
}

impl ImageOperation for Rescale {
    fn name(&self) -> &'static str {
        "rescale"
    }

    fn output_shape(&self, input: ImageShape) -> Result<ImageShape> {
        self.validate()?;
        Ok(input)
    }

    fn apply(&self, mut image: Image) -> Result<Image> {
        self.validate()?;
        let c = self.scaling_coefficient;
        image.data_mut().mapv_inplace(|v| v / c);

        let (min, max) = image.bounds_mut();
        for (lo, hi) in min.iter_mut().zip(max.iter_mut()) {
            let (a, b) = (*lo / c, *hi / c);
            // A negative coefficient flips the interval
            *lo = a.min(b);
            *hi = a.max(b);
        }
        Ok(image)
    }
}
