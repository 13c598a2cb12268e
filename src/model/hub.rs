//! Model downloading and caching.

use std::ffi::OsStr;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{Error, Result};

use super::OnnxModel;

/// A directory of downloaded model files.
#[derive(Debug, Clone)]
pub struct ModelHub {
    cache_dir: PathBuf,
}

impl ModelHub {
    /// Opens the platform cache directory.
    ///
    /// - Windows: `%LOCALAPPDATA%\prepix\models`
    /// - Linux: `~/.cache/prepix/models`
    /// - macOS: `~/Library/Caches/prepix/models`
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub fn new() -> Result<Self> {
        let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::with_dir(base.join("prepix").join("models"))
    }

    /// Uses `cache_dir` instead of the platform default.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir).map_err(|source| Error::CacheDir {
            path: cache_dir.clone(),
            source,
        })?;
        Ok(Self { cache_dir })
    }

    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path of the cached file `name`, downloading it from `url` first if
    /// it is not cached yet.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a plain file name or the download fails.
    pub fn fetch(&self, name: &str, url: &str) -> Result<PathBuf> {
        if name.is_empty() || Path::new(name).file_name() != Some(OsStr::new(name)) {
            return Err(Error::invalid(
                "name",
                format!("{name:?} is not a plain file name"),
            ));
        }
        let path = self.cache_dir.join(name);
        if path.is_file() {
            tracing::debug!("Using cached {}", path.display());
        } else {
            download_file(url, &path, name)?;
        }
        Ok(path)
    }

    /// Fetches `name` and opens it as an ONNX session.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be fetched or loaded.
    pub fn load(&self, name: &str, url: &str) -> Result<OnnxModel> {
        let path = self.fetch(name, url)?;
        OnnxModel::from_file(path)
    }
}

/// Downloads `url` to `path` through a temporary file.
fn download_file(url: &str, path: &Path, name: &str) -> Result<()> {
    tracing::info!("Downloading {name} from {url}");

    let client = reqwest::blocking::Client::new();
    let mut response = client
        .get(url)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(|source| Error::ModelDownload {
            name: name.to_string(),
            source,
        })?;

    let pb = match response.content_length() {
        Some(total) => ProgressBar::new(total),
        None => ProgressBar::new_spinner(),
    };
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }

    let result = write_atomically(&mut response, path, &pb);
    pb.finish_and_clear();
    result?;
    tracing::info!("Saved {name} to {}", path.display());

    Ok(())
}

/// Streams `reader` into `<path>.part` and renames it to `path` once complete.
/// The partial file is removed if anything fails.
fn write_atomically(reader: &mut impl Read, path: &Path, pb: &ProgressBar) -> Result<()> {
    let temp_path = path.with_extension("part");
    let result = stream_to(reader, &temp_path, pb).and_then(|()| fs::rename(&temp_path, path));
    if let Err(err) = result {
        if let Err(cleanup) = fs::remove_file(&temp_path) {
            tracing::debug!("Could not remove {}: {cleanup}", temp_path.display());
        }
        return Err(err.into());
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn stream_to(reader: &mut impl Read, path: &Path, pb: &ProgressBar) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    let mut buffer = [0u8; 8192];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])?;
        pb.inc(read as u64);
    }
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_file_is_not_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let hub = ModelHub::with_dir(dir.path().join("models")).unwrap();
        fs::write(hub.cache_dir().join("tiny.onnx"), b"cached").unwrap();

        let path = hub.fetch("tiny.onnx", "http://127.0.0.1:9/unused").unwrap();
        assert_eq!(fs::read(path).unwrap(), b"cached");
    }

    #[test]
    fn test_rejects_nested_names() {
        let dir = tempfile::tempdir().unwrap();
        let hub = ModelHub::with_dir(dir.path()).unwrap();
        assert!(matches!(
            hub.fetch("../escape.onnx", "http://127.0.0.1:9/unused"),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(hub.fetch("", "http://127.0.0.1:9/unused").is_err());
    }

    /// Yields some bytes, then fails like a dropped connection.
    struct Interrupted {
        sent: bool,
    }

    impl Read for Interrupted {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.sent {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset",
                ));
            }
            self.sent = true;
            buf[..4].copy_from_slice(b"onnx");
            Ok(4)
        }
    }

    #[test]
    fn test_failed_transfer_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.onnx");
        let pb = ProgressBar::hidden();

        let result = write_atomically(&mut Interrupted { sent: false }, &path, &pb);
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(!path.exists());
        assert!(!path.with_extension("part").exists());
    }

    #[test]
    fn test_complete_transfer_is_renamed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.onnx");
        let pb = ProgressBar::hidden();

        write_atomically(&mut &b"weights"[..], &path, &pb).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"weights");
        assert!(!path.with_extension("part").exists());
    }
}
