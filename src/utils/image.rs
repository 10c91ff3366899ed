//! Image loading.

use crate::core::{OCRError, OcrResult};
use image::DynamicImage;
use std::path::Path;
use tracing::debug;

/// Loads an image from a file path.
///
/// The format is inferred from the file contents. Single-channel images
/// stay single-channel; everything else is normalized to RGB so the
/// engines see one of the two layouts they accept.
///
/// # Errors
///
/// Returns [`OCRError::ImageLoad`] when the file cannot be read or
/// decoded.
pub fn load_image(path: impl AsRef<Path>) -> OcrResult<DynamicImage> {
    let path = path.as_ref();
    debug!(path = %path.display(), "loading image");
    let image = image::open(path).map_err(OCRError::ImageLoad)?;
    Ok(match image {
        DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(gray),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    })
}
