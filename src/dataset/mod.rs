//! Batch preprocessing of image folders.
//!
//! [`ImageDataset::from_pipeline`] walks the Load stage's path, runs the
//! pipeline on every image in parallel and keeps the flat buffers together
//! with their labels.

mod labels;

pub use labels::{FromFolders, LabelGenerator};

use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::ops::TensorLayout;
use crate::pipeline::Pipeline;
use crate::shape::ImageShape;

/// One preprocessed image.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub path: PathBuf,
    pub data: Vec<f32>,
    pub label: Option<u32>,
}

/// Preprocessed images sharing one shape and layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDataset {
    samples: Vec<Sample>,
    shape: ImageShape,
    layout: TensorLayout,
}

impl ImageDataset {
    /// Runs `pipeline` on every image under its Load path.
    ///
    /// The path may be a single file or a directory, which is searched
    /// recursively. Files are processed in sorted path order.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline has no Load path, its output shape is
    /// not fully determined by its configuration, or any image fails.
    pub fn from_pipeline(pipeline: &Pipeline) -> Result<Self> {
        let load = pipeline
            .load()
            .ok_or_else(|| Error::invalid("load", "dataset loading needs a load stage"))?;
        let root = load
            .path
            .as_deref()
            .ok_or_else(|| Error::invalid("load.path", "dataset loading needs a path"))?;
        let shape = pipeline.final_shape(ImageShape::unknown())?;

        let files = collect_images(root)?;
        tracing::info!("Loading {} images from {}", files.len(), root.display());

        let pb = ProgressBar::new(files.len() as u64);
        let template = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta})";
        if let Ok(style) = ProgressStyle::with_template(template) {
            pb.set_style(style.progress_chars("#>-"));
        }

        let samples = files
            .par_iter()
            .map(|path| {
                let out = pipeline.apply_file(path)?;
                pb.inc(1);
                if out.shape != shape {
                    return Err(Error::ShapeMismatch {
                        expected: shape.to_string(),
                        actual: format!("{} for {}", out.shape, path.display()),
                    });
                }
                Ok(Sample {
                    label: load.label(path),
                    path: path.clone(),
                    data: out.data,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        pb.finish_and_clear();

        Ok(Self {
            samples,
            shape,
            layout: pipeline.layout(),
        })
    }

    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    #[must_use]
    pub const fn shape(&self) -> ImageShape {
        self.shape
    }

    #[must_use]
    pub const fn layout(&self) -> TensorLayout {
        self.layout
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Reorders the samples; the same seed always gives the same order.
    #[must_use]
    pub fn shuffle(mut self, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        self.samples.shuffle(&mut rng);
        self
    }

    /// Splits into `(train, test)`, with `ratio` of the samples in `train`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] unless `ratio` is in `[0, 1]`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn split(mut self, ratio: f32) -> Result<(Self, Self)> {
        if !(0.0..=1.0).contains(&ratio) {
            return Err(Error::invalid(
                "ratio",
                format!("must be in [0, 1], got {ratio}"),
            ));
        }
        let point = (self.samples.len() as f32 * ratio).round() as usize;
        let test = self.samples.split_off(point.min(self.samples.len()));
        let test = Self {
            samples: test,
            shape: self.shape,
            layout: self.layout,
        };
        Ok((self, test))
    }
}

/// Image files under `root`, sorted by path.
fn collect_images(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if root.is_file() {
        files.push(root.to_path_buf());
    } else {
        visit(root, &mut files)?;
    }
    files.sort();
    Ok(files)
}

fn visit(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            visit(&path, files)?;
        } else if ImageFormat::from_path(&path).is_ok() {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{Interpolation, Load};

    fn write_png(path: &Path, width: u32, height: u32) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]))
            .save(path)
            .unwrap();
    }

    fn fixture(dir: &Path) {
        write_png(&dir.join("cat/1.png"), 8, 6);
        write_png(&dir.join("cat/2.png"), 5, 5);
        write_png(&dir.join("dog/3.png"), 7, 9);
        write_png(&dir.join("dog/4.png"), 4, 4);
        fs::write(dir.join("dog/notes.txt"), "not an image").unwrap();
    }

    fn pipeline(dir: &Path) -> Pipeline {
        Pipeline::builder()
            .load(
                Load::new()
                    .with_path(dir)
                    .with_labels(FromFolders::new([("cat", 0), ("dog", 1)])),
            )
            .resize(4, 4, Interpolation::Nearest)
            .rescale(255.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_from_pipeline_labels_and_orders() {
        let dir = tempfile::tempdir().unwrap();
        fixture(dir.path());
        let dataset = ImageDataset::from_pipeline(&pipeline(dir.path())).unwrap();

        assert_eq!(dataset.len(), 4);
        assert_eq!(dataset.shape(), ImageShape::new(4, 4, 3));
        let labels: Vec<_> = dataset.samples().iter().map(|s| s.label).collect();
        assert_eq!(labels, vec![Some(0), Some(0), Some(1), Some(1)]);
        for sample in dataset.samples() {
            assert_eq!(sample.data.len(), 4 * 4 * 3);
            assert!((sample.data[0] - 10.0 / 255.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_requires_resolved_shape() {
        let dir = tempfile::tempdir().unwrap();
        fixture(dir.path());
        let pipeline = Pipeline::builder()
            .load(Load::new().with_path(dir.path()))
            .build()
            .unwrap();
        assert!(matches!(
            ImageDataset::from_pipeline(&pipeline),
            Err(Error::UnresolvedShape { .. })
        ));
    }

    #[test]
    fn test_requires_load_path() {
        let pipeline = Pipeline::builder().load(Load::new()).build().unwrap();
        assert!(matches!(
            ImageDataset::from_pipeline(&pipeline),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_shuffle_is_deterministic_and_split() {
        let dir = tempfile::tempdir().unwrap();
        fixture(dir.path());
        let dataset = ImageDataset::from_pipeline(&pipeline(dir.path())).unwrap();

        let a = dataset.clone().shuffle(7);
        let b = dataset.clone().shuffle(7);
        assert_eq!(a, b);

        let (train, test) = a.split(0.75).unwrap();
        assert_eq!(train.len(), 3);
        assert_eq!(test.len(), 1);
        assert!(dataset.split(1.5).is_err());
    }
}
