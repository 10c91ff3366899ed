//! DB-style text detection.
//!
//! The detector resizes the page so its longest side fits the model input
//! budget, runs a segmentation network producing a per-pixel text
//! probability map, and turns the thresholded map into axis-aligned word
//! boxes via connected components. Box coordinates are reported in the
//! original image's coordinate space.

use crate::backends::session::build_session;
use crate::core::{OCRError, OrtSessionConfig, ResolvedAcceleration};
use image::imageops::FilterType;
use image::{GrayImage, Luma, RgbImage};
use imageproc::region_labelling::{Connectivity, connected_components};
use ndarray::{Array2, Array4};
use ort::session::Session;
use ort::value::TensorRef;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// Longest side the page is resized to before detection.
const MAX_SIDE: u32 = 960;
/// Both input dimensions are rounded to a multiple of this stride.
const STRIDE: u32 = 32;
/// Probability above which a pixel counts as text.
const BITMAP_THRESHOLD: f32 = 0.3;
/// Mean probability a component must reach to be kept as a box.
const BOX_SCORE_THRESHOLD: f32 = 0.6;
/// Components narrower or shorter than this are discarded as noise.
const MIN_BOX_SIDE: f32 = 3.0;
/// Expansion ratio applied to each kept box (segmentation maps shrink
/// text regions, so boxes are grown back before cropping).
const UNCLIP_RATIO: f32 = 1.5;

/// Per-channel normalization constants shared with common detection
/// checkpoints (ImageNet statistics).
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// An axis-aligned text region in original-image coordinates.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DetectedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Mean text probability over the region.
    pub score: f32,
}

/// The detection component. One ONNX session, shared behind a mutex.
pub(crate) struct TextDetector {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl TextDetector {
    /// Loads the detection model from `path`.
    pub(crate) fn load(
        path: &Path,
        acceleration: ResolvedAcceleration,
        config: Option<&OrtSessionConfig>,
    ) -> Result<Self, OCRError> {
        let session = build_session(path, acceleration, config)?;
        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| OCRError::model_load(path, "detection model has no inputs", None::<std::io::Error>))?;
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| OCRError::model_load(path, "detection model has no outputs", None::<std::io::Error>))?;
        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }

    /// Detects text regions in `image`, sorted top-to-bottom then
    /// left-to-right.
    pub(crate) fn detect(&self, image: &RgbImage) -> Result<Vec<DetectedBox>, OCRError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let (input_w, input_h) = model_input_size(width, height);
        let resized = image::imageops::resize(image, input_w, input_h, FilterType::Triangle);
        let tensor = normalize_to_nchw(&resized);

        let map = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| ort::Error::new("detection session lock poisoned"))?;
            let inputs =
                ort::inputs![self.input_name.as_str() => TensorRef::from_array_view(tensor.view())?];
            let outputs = session.run(inputs)?;
            let (shape, data) = outputs[self.output_name.as_str()].try_extract_tensor::<f32>()?;
            probability_map(shape, data)?
        };

        let scale_x = width as f32 / input_w as f32;
        let scale_y = height as f32 / input_h as f32;
        let mut boxes = boxes_from_probability_map(
            &map,
            BITMAP_THRESHOLD,
            BOX_SCORE_THRESHOLD,
            MIN_BOX_SIDE,
            UNCLIP_RATIO,
        );
        for b in &mut boxes {
            b.x = (b.x * scale_x).max(0.0);
            b.y = (b.y * scale_y).max(0.0);
            b.width = (b.width * scale_x).min(width as f32 - b.x);
            b.height = (b.height * scale_y).min(height as f32 - b.y);
        }
        debug!(count = boxes.len(), "text regions detected");
        Ok(boxes)
    }
}

/// Returns the model input size: longest side capped at [`MAX_SIDE`],
/// both sides rounded up to a multiple of [`STRIDE`].
fn model_input_size(width: u32, height: u32) -> (u32, u32) {
    let longest = width.max(height);
    let ratio = if longest > MAX_SIDE {
        MAX_SIDE as f32 / longest as f32
    } else {
        1.0
    };
    let round = |side: u32| -> u32 {
        let scaled = (side as f32 * ratio).round().max(1.0) as u32;
        scaled.div_ceil(STRIDE) * STRIDE
    };
    (round(width), round(height))
}

/// Packs an RGB image into a normalized NCHW tensor.
fn normalize_to_nchw(image: &RgbImage) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let mut tensor = Array4::zeros((1, 3, height as usize, width as usize));
    for (x, y, pixel) in image.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] =
                (pixel.0[c] as f32 / 255.0 - MEAN[c]) / STD[c];
        }
    }
    tensor
}

/// Reinterprets the model output as an HxW probability map. Accepts the
/// common `[1, 1, H, W]` layout.
fn probability_map(shape: &[i64], data: &[f32]) -> Result<Array2<f32>, OCRError> {
    let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
    let (h, w) = match dims.as_slice() {
        [1, 1, h, w] => (*h, *w),
        [1, h, w] => (*h, *w),
        other => {
            return Err(OCRError::engine_runtime_msg(
                "detector",
                format!("unexpected detection output shape {other:?}"),
            ));
        }
    };
    Array2::from_shape_vec((h, w), data.to_vec()).map_err(|e| {
        OCRError::engine_runtime_msg("detector", format!("detection output reshape failed: {e}"))
    })
}

/// Converts a probability map into scored boxes.
///
/// Pixels above `bitmap_threshold` are labelled into 4-connected
/// components; each component becomes its bounding box, kept when its
/// mean probability reaches `score_threshold` and both sides reach
/// `min_side`, then grown by `unclip_ratio` relative to its area over
/// perimeter. Coordinates stay in map space.
pub(crate) fn boxes_from_probability_map(
    map: &Array2<f32>,
    bitmap_threshold: f32,
    score_threshold: f32,
    min_side: f32,
    unclip_ratio: f32,
) -> Vec<DetectedBox> {
    let (height, width) = map.dim();
    if height == 0 || width == 0 {
        return Vec::new();
    }

    let mask = GrayImage::from_fn(width as u32, height as u32, |x, y| {
        if map[(y as usize, x as usize)] > bitmap_threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });
    let labels = connected_components(&mask, Connectivity::Four, Luma([0u8]));

    struct Extent {
        min_x: u32,
        min_y: u32,
        max_x: u32,
        max_y: u32,
        score_sum: f32,
        count: u32,
    }
    let mut extents: HashMap<u32, Extent> = HashMap::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label.0[0];
        if label == 0 {
            continue;
        }
        let score = map[(y as usize, x as usize)];
        let e = extents.entry(label).or_insert(Extent {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            score_sum: 0.0,
            count: 0,
        });
        e.min_x = e.min_x.min(x);
        e.min_y = e.min_y.min(y);
        e.max_x = e.max_x.max(x);
        e.max_y = e.max_y.max(y);
        e.score_sum += score;
        e.count += 1;
    }

    let mut boxes: Vec<DetectedBox> = extents
        .into_values()
        .filter_map(|e| {
            let w = (e.max_x - e.min_x + 1) as f32;
            let h = (e.max_y - e.min_y + 1) as f32;
            let score = e.score_sum / e.count as f32;
            if w < min_side || h < min_side || score < score_threshold {
                return None;
            }
            // Grow the box the way DB unclipping does, by area over
            // perimeter, so tight segmentation masks recover the full
            // glyph extent.
            let margin = (w * h) * unclip_ratio / (2.0 * (w + h));
            Some(DetectedBox {
                x: (e.min_x as f32 - margin).max(0.0),
                y: (e.min_y as f32 - margin).max(0.0),
                width: (w + 2.0 * margin).min(width as f32),
                height: (h + 2.0 * margin).min(height as f32),
                score,
            })
        })
        .collect();

    boxes.sort_by(|a, b| {
        (a.y, a.x)
            .partial_cmp(&(b.y, b.x))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    boxes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_with_blocks(blocks: &[(usize, usize, usize, usize, f32)]) -> Array2<f32> {
        let mut map = Array2::zeros((64, 96));
        for &(x0, y0, w, h, p) in blocks {
            for y in y0..y0 + h {
                for x in x0..x0 + w {
                    map[(y, x)] = p;
                }
            }
        }
        map
    }

    #[test]
    fn distinct_blocks_become_distinct_boxes_in_reading_order() {
        let map = map_with_blocks(&[(60, 30, 20, 8, 0.9), (5, 5, 20, 8, 0.9)]);
        let boxes = boxes_from_probability_map(&map, 0.3, 0.6, 3.0, 1.5);
        assert_eq!(boxes.len(), 2);
        assert!(boxes[0].y < boxes[1].y, "boxes not in reading order");
    }

    #[test]
    fn low_probability_blocks_are_dropped() {
        let map = map_with_blocks(&[(5, 5, 20, 8, 0.4), (40, 30, 20, 8, 0.9)]);
        let boxes = boxes_from_probability_map(&map, 0.3, 0.6, 3.0, 1.5);
        assert_eq!(boxes.len(), 1);
        assert!(boxes[0].x < 41.0 && boxes[0].x > 30.0);
    }

    #[test]
    fn tiny_specks_are_dropped() {
        let map = map_with_blocks(&[(5, 5, 2, 2, 0.95)]);
        let boxes = boxes_from_probability_map(&map, 0.3, 0.6, 3.0, 1.5);
        assert!(boxes.is_empty());
    }

    #[test]
    fn unclipping_grows_the_component_extent() {
        let map = map_with_blocks(&[(30, 20, 30, 10, 0.9)]);
        let boxes = boxes_from_probability_map(&map, 0.3, 0.6, 3.0, 1.5);
        assert_eq!(boxes.len(), 1);
        assert!(boxes[0].width > 30.0);
        assert!(boxes[0].height > 10.0);
        assert!(boxes[0].x < 30.0);
    }

    #[test]
    fn input_size_is_capped_and_stride_aligned() {
        let (w, h) = model_input_size(2000, 1000);
        assert!(w <= MAX_SIDE + STRIDE);
        assert_eq!(w % STRIDE, 0);
        assert_eq!(h % STRIDE, 0);

        let (w, h) = model_input_size(100, 50);
        assert_eq!(w % STRIDE, 0);
        assert_eq!(h % STRIDE, 0);
        assert!(w >= 100);
    }
}
