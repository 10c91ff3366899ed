//! The toggleable preprocessing pipeline.
//!
//! Stages apply in a fixed order regardless of which toggles are enabled:
//! grayscale, denoise, contrast enhancement, deskew, binarization. The
//! order is load-bearing: contrast enhancement and binarization require a
//! single-channel image, which the grayscale stage establishes. Disabling
//! grayscale while enabling either of those stages against a multi-channel
//! image is a precondition violation and fails with
//! [`OCRError::Preprocess`].

use crate::core::{OCRError, PreprocessStage};
use crate::processors::{adaptive_threshold_gaussian, clahe, deskew};
use image::{DynamicImage, GrayImage};
use imageproc::filter::median_filter;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// CLAHE tile grid used by the enhancement stage (8x8 tiles).
const CLAHE_TILES: (u32, u32) = (8, 8);
/// CLAHE clip limit used by the enhancement stage.
const CLAHE_CLIP_LIMIT: f32 = 2.0;
/// Neighborhood size of the adaptive threshold, in pixels.
const THRESHOLD_BLOCK_SIZE: u32 = 11;
/// Constant subtracted from the local Gaussian mean before thresholding.
const THRESHOLD_OFFSET: f32 = 2.0;

/// Toggles for the preprocessing pipeline.
///
/// Each stage is independently enabled; the application order is fixed.
/// The default enables everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Reduce multi-channel input to single-channel luminance.
    pub grayscale: bool,
    /// Apply a 3x3 median filter to suppress salt-and-pepper noise.
    pub denoise: bool,
    /// Apply CLAHE contrast enhancement (single-channel input only).
    pub enhance: bool,
    /// Apply Gaussian-weighted adaptive binarization (single-channel only).
    pub binarize: bool,
    /// Estimate and correct the dominant text-block rotation.
    pub deskew: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            grayscale: true,
            denoise: true,
            enhance: true,
            binarize: true,
            deskew: true,
        }
    }
}

impl PreprocessConfig {
    /// A configuration with every stage disabled.
    pub fn none() -> Self {
        Self {
            grayscale: false,
            denoise: false,
            enhance: false,
            binarize: false,
            deskew: false,
        }
    }
}

/// Applies the enabled preprocessing stages to an image.
///
/// The input is never mutated; the returned image always has the same
/// dimensions as the input. Input is expected as RGB or single-channel
/// (other formats are converted to RGB first).
///
/// # Errors
///
/// Returns [`OCRError::Preprocess`] when contrast enhancement or
/// binarization is enabled while the image reaching that stage still has
/// more than one channel.
pub fn preprocess_image(
    image: &DynamicImage,
    config: PreprocessConfig,
) -> Result<DynamicImage, OCRError> {
    let mut current = match image {
        DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(gray.clone()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    };

    if config.grayscale {
        // A true single-channel input passes through unchanged.
        if !matches!(current, DynamicImage::ImageLuma8(_)) {
            debug!("preprocess: grayscale conversion");
            current = DynamicImage::ImageLuma8(current.to_luma8());
        }
    }

    if config.denoise {
        debug!("preprocess: 3x3 median denoise");
        current = match current {
            DynamicImage::ImageLuma8(gray) => {
                DynamicImage::ImageLuma8(median_filter(&gray, 1, 1))
            }
            DynamicImage::ImageRgb8(rgb) => DynamicImage::ImageRgb8(median_filter(&rgb, 1, 1)),
            other => other,
        };
    }

    if config.enhance {
        debug!(
            tiles = ?CLAHE_TILES,
            clip_limit = CLAHE_CLIP_LIMIT,
            "preprocess: CLAHE contrast enhancement"
        );
        let gray = expect_single_channel(&current, PreprocessStage::Enhance)?;
        current =
            DynamicImage::ImageLuma8(clahe(gray, CLAHE_TILES.0, CLAHE_TILES.1, CLAHE_CLIP_LIMIT));
    }

    if config.deskew {
        debug!("preprocess: deskew");
        current = deskew(&current);
    }

    if config.binarize {
        debug!(
            block_size = THRESHOLD_BLOCK_SIZE,
            offset = THRESHOLD_OFFSET,
            "preprocess: adaptive binarization"
        );
        let gray = expect_single_channel(&current, PreprocessStage::Binarize)?;
        current = DynamicImage::ImageLuma8(adaptive_threshold_gaussian(
            gray,
            THRESHOLD_BLOCK_SIZE,
            THRESHOLD_OFFSET,
        ));
    }

    Ok(current)
}

/// Returns the image's gray buffer, or a precondition error when the image
/// reaching a single-channel stage still has multiple channels.
fn expect_single_channel(
    image: &DynamicImage,
    stage: PreprocessStage,
) -> Result<&GrayImage, OCRError> {
    match image {
        DynamicImage::ImageLuma8(gray) => Ok(gray),
        other => Err(OCRError::precondition(
            stage,
            format!(
                "expected single-channel input, got {:?}; enable the grayscale stage first",
                other.color()
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    fn gradient_rgb(width: u32, height: u32) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            let v = ((x * 7 + y * 13) % 256) as u8;
            Rgb([v, v.wrapping_add(20), v.wrapping_add(40)])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn dimensions_preserved_for_all_valid_toggle_combinations() {
        let input = gradient_rgb(64, 48);
        for bits in 0..32u8 {
            let config = PreprocessConfig {
                grayscale: bits & 1 != 0,
                denoise: bits & 2 != 0,
                enhance: bits & 4 != 0,
                binarize: bits & 8 != 0,
                deskew: bits & 16 != 0,
            };
            // Combinations feeding multi-channel input into single-channel
            // stages are precondition violations, checked separately.
            if (config.enhance || config.binarize) && !config.grayscale {
                continue;
            }
            let out = preprocess_image(&input, config).expect("valid combination");
            assert_eq!(out.width(), 64, "width changed for {config:?}");
            assert_eq!(out.height(), 48, "height changed for {config:?}");
        }
    }

    #[test]
    fn enhance_without_grayscale_on_rgb_is_a_precondition_violation() {
        let input = gradient_rgb(32, 32);
        let config = PreprocessConfig {
            grayscale: false,
            denoise: false,
            enhance: true,
            binarize: false,
            deskew: false,
        };
        let err = preprocess_image(&input, config).unwrap_err();
        assert!(matches!(
            err,
            OCRError::Preprocess {
                stage: crate::core::PreprocessStage::Enhance,
                ..
            }
        ));
    }

    #[test]
    fn binarize_without_grayscale_on_gray_input_is_accepted() {
        // A true single-channel input satisfies the precondition even when
        // the grayscale toggle is off.
        let gray = image::GrayImage::from_pixel(20, 20, Luma([128]));
        let input = DynamicImage::ImageLuma8(gray);
        let config = PreprocessConfig {
            grayscale: false,
            denoise: false,
            enhance: false,
            binarize: true,
            deskew: false,
        };
        let out = preprocess_image(&input, config).expect("gray input is single-channel");
        let out = out.to_luma8();
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn disabled_pipeline_returns_equal_pixels() {
        let input = gradient_rgb(16, 16);
        let out = preprocess_image(&input, PreprocessConfig::none()).unwrap();
        assert_eq!(out.to_rgb8().as_raw(), input.to_rgb8().as_raw());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: PreprocessConfig = serde_json::from_str(r#"{"binarize": false}"#).unwrap();
        assert!(config.grayscale);
        assert!(!config.binarize);
    }
}
