//! The composed detect-(orient)-recognize reading stack.
//!
//! A reader owns one detection session, one recognition session and an
//! optional orientation classifier, all built from the same acceleration
//! decision. `read_text` is the only entry point the engines call.

use crate::backends::classifier::OrientationClassifier;
use crate::backends::detector::TextDetector;
use crate::backends::fetch::ModelSource;
use crate::backends::recognizer::TextRecognizer;
use crate::core::{OCRError, OrtSessionConfig, ResolvedAcceleration};
use image::RgbImage;
use image::imageops;
use std::path::Path;
use tracing::debug;

/// The model artifacts a reader is built from.
#[derive(Debug, Clone)]
pub struct ReaderSpec {
    /// Text detection model.
    pub detection: ModelSource,
    /// Text recognition model.
    pub recognition: ModelSource,
    /// Recognition dictionary (one character per line).
    pub dictionary: ModelSource,
    /// Optional 0/180 degree crop orientation model.
    pub orientation: Option<ModelSource>,
}

/// One recognized text region.
#[derive(Debug, Clone, PartialEq)]
pub struct TextDetection {
    /// Corner points in image coordinates: top-left, top-right,
    /// bottom-right, bottom-left.
    pub polygon: [(f32, f32); 4],
    /// The decoded text.
    pub text: String,
    /// Recognition confidence in `[0, 1]`.
    pub confidence: f32,
}

impl TextDetection {
    /// Vertical position used for line grouping.
    pub fn top_left_y(&self) -> f32 {
        self.polygon[0].1
    }
}

/// A detect-then-recognize ONNX reading stack.
pub struct OnnxTextReader {
    detector: TextDetector,
    recognizer: TextRecognizer,
    classifier: Option<OrientationClassifier>,
}

impl OnnxTextReader {
    /// Builds a reader from its model spec, fetching missing artifacts
    /// into `model_dir` when `allow_download` permits.
    pub fn from_spec(
        spec: &ReaderSpec,
        acceleration: ResolvedAcceleration,
        session_config: Option<&OrtSessionConfig>,
        model_dir: &Path,
        allow_download: bool,
    ) -> Result<Self, OCRError> {
        let detection = spec.detection.ensure_local(model_dir, allow_download)?;
        let recognition = spec.recognition.ensure_local(model_dir, allow_download)?;
        let dictionary = spec.dictionary.ensure_local(model_dir, allow_download)?;

        let detector = TextDetector::load(&detection, acceleration, session_config)?;
        let recognizer =
            TextRecognizer::load(&recognition, &dictionary, acceleration, session_config)?;
        let classifier = match &spec.orientation {
            Some(source) => {
                let path = source.ensure_local(model_dir, allow_download)?;
                Some(OrientationClassifier::load(
                    &path,
                    acceleration,
                    session_config,
                )?)
            }
            None => None,
        };

        Ok(Self {
            detector,
            recognizer,
            classifier,
        })
    }

    /// Reads all text regions in `image`, in reading order (top to
    /// bottom, then left to right).
    ///
    /// Every detected region is returned, including low-confidence and
    /// empty decodes; filtering is the caller's policy.
    pub fn read_text(&self, image: &RgbImage) -> Result<Vec<TextDetection>, OCRError> {
        let boxes = self.detector.detect(image)?;
        let mut detections = Vec::with_capacity(boxes.len());

        for b in boxes {
            let x = b.x.floor().max(0.0) as u32;
            let y = b.y.floor().max(0.0) as u32;
            let w = (b.width.ceil() as u32).min(image.width().saturating_sub(x)).max(1);
            let h = (b.height.ceil() as u32).min(image.height().saturating_sub(y)).max(1);
            let mut crop = imageops::crop_imm(image, x, y, w, h).to_image();

            if let Some(classifier) = &self.classifier {
                if classifier.is_upside_down(&crop)? {
                    debug!(x, y, "flipping upside-down crop before recognition");
                    crop = imageops::rotate180(&crop);
                }
            }

            let (text, confidence) = self.recognizer.recognize(&crop)?;
            detections.push(TextDetection {
                polygon: [
                    (b.x, b.y),
                    (b.x + b.width, b.y),
                    (b.x + b.width, b.y + b.height),
                    (b.x, b.y + b.height),
                ],
                text,
                confidence,
            });
        }
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_left_y_reads_the_first_corner() {
        let detection = TextDetection {
            polygon: [(4.0, 10.0), (40.0, 10.0), (40.0, 22.0), (4.0, 22.0)],
            text: "mot".to_string(),
            confidence: 0.8,
        };
        assert_eq!(detection.top_left_y(), 10.0);
    }
}
