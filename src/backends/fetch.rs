//! Cached download of model artifacts.
//!
//! Every neural model and recognition dictionary is described by a
//! [`ModelSource`]. The first use downloads the artifact into the
//! configured model directory; later uses short-circuit on the cached
//! file without touching the network.

use crate::core::OCRError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A remote model artifact and the file name it is cached under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSource {
    /// The remote location of the artifact.
    pub url: String,
    /// File name inside the model directory.
    pub file_name: String,
}

impl ModelSource {
    /// Creates a model source from a URL and a cache file name.
    pub fn new(url: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            file_name: file_name.into(),
        }
    }

    /// Returns the local path of the artifact, downloading it first when
    /// it is not cached yet.
    ///
    /// # Errors
    ///
    /// Returns [`OCRError::ModelLoad`] when the artifact is missing and
    /// downloads are disabled, and [`OCRError::ModelFetch`] when the
    /// download itself fails.
    pub fn ensure_local(&self, model_dir: &Path, allow_download: bool) -> Result<PathBuf, OCRError> {
        let target = model_dir.join(&self.file_name);
        if target.is_file() {
            debug!(path = %target.display(), "model artifact already cached");
            return Ok(target);
        }

        if !allow_download {
            return Err(OCRError::model_load(
                &target,
                "artifact is missing and downloads are disabled",
                None::<std::io::Error>,
            ));
        }

        fs::create_dir_all(model_dir)?;
        info!(url = %self.url, path = %target.display(), "fetching model artifact");

        let mut response = reqwest::blocking::get(&self.url)
            .and_then(|r| r.error_for_status())
            .map_err(|e| OCRError::model_fetch(&self.url, "request failed", Some(e)))?;

        // Stream into a temporary name (model files run to hundreds of
        // megabytes) so a partial download never satisfies the cache
        // check of a later run.
        let staging = target.with_extension("part");
        let mut file = fs::File::create(&staging)?;
        response
            .copy_to(&mut file)
            .map_err(|e| OCRError::model_fetch(&self.url, "downloading body failed", Some(e)))?;
        fs::rename(&staging, &target)?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_artifact_short_circuits_without_network() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("model.onnx"), b"cached bytes").unwrap();

        // The URL is unreachable; reaching for it would fail the test.
        let source = ModelSource::new("http://invalid.localdomain/model.onnx", "model.onnx");
        let path = source.ensure_local(dir.path(), true).unwrap();
        assert_eq!(path, dir.path().join("model.onnx"));
    }

    #[test]
    fn missing_artifact_with_downloads_disabled_is_a_model_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = ModelSource::new("http://invalid.localdomain/model.onnx", "model.onnx");
        let err = source.ensure_local(dir.path(), false).unwrap_err();
        assert!(matches!(err, OCRError::ModelLoad { .. }));
    }

    #[test]
    fn leftover_staging_file_does_not_satisfy_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("model.part"), b"truncated download").unwrap();

        let source = ModelSource::new("http://invalid.localdomain/model.onnx", "model.onnx");
        let err = source.ensure_local(dir.path(), true).unwrap_err();
        assert!(matches!(err, OCRError::ModelFetch { .. }));
    }

    #[test]
    fn unreachable_source_is_a_model_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = ModelSource::new("http://invalid.localdomain/model.onnx", "model.onnx");
        let err = source.ensure_local(dir.path(), true).unwrap_err();
        assert!(matches!(err, OCRError::ModelFetch { .. }));
    }
}
