//! Label generators for dataset samples.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Assigns a class label to an image file.
pub trait LabelGenerator: fmt::Debug + Send + Sync {
    /// Label for `path`, or `None` if the file is unlabeled.
    fn label(&self, path: &Path) -> Option<u32>;
}

/// Labels a file by the name of the directory that contains it.
///
/// With the mapping `{"cat": 0, "dog": 1}`, `data/cat/001.jpg` gets label 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FromFolders {
    pub mapping: BTreeMap<String, u32>,
}

impl FromFolders {
    #[must_use]
    pub fn new<I, S>(mapping: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self {
            mapping: mapping.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl LabelGenerator for FromFolders {
    fn label(&self, path: &Path) -> Option<u32> {
        let folder = path.parent()?.file_name()?.to_str()?;
        self.mapping.get(folder).copied()
    }
}
