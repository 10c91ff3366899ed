//! The word-level neural engine.
//!
//! Readers are expensive (first use downloads model weights, then
//! deserializes them), so one reader is built lazily per distinct
//! language selection and cached for the engine's lifetime. Hardware
//! acceleration is resolved once at engine construction and handed to
//! every reader built afterwards.

use crate::backends::{ModelSource, OnnxTextReader, ReaderSpec, TextDetection};
use crate::core::{OCRError, OcrConfig, OrtSessionConfig, ResolvedAcceleration};
use crate::engines::{Language, OcrEngine};
use image::DynamicImage;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const ENGINE_NAME: &str = "easyocr";

/// Detections below this confidence are discarded.
const CONFIDENCE_THRESHOLD: f32 = 0.3;
/// Vertical gap between consecutive detections that starts a new line.
const LINE_GAP: f32 = 15.0;

const MODEL_BASE: &str = "https://huggingface.co/SWHL/RapidOCR/resolve/main";

/// Word-level neural OCR: detect word boxes, recognize each crop, and
/// regroup into lines by vertical position.
pub struct EasyOcrEngine {
    acceleration: ResolvedAcceleration,
    session_config: Option<OrtSessionConfig>,
    model_dir: PathBuf,
    allow_download: bool,
    readers: Mutex<HashMap<Language, Arc<OnnxTextReader>>>,
}

impl EasyOcrEngine {
    /// Creates the engine. No model is loaded here; the first extraction
    /// per language selection pays the construction cost.
    pub fn new(config: &OcrConfig) -> Self {
        let acceleration = config.acceleration.resolve();
        debug!(?acceleration, "word-level engine created");
        Self {
            acceleration,
            session_config: config.ort_session.clone(),
            model_dir: config.model_dir.clone(),
            allow_download: config.allow_download,
            readers: Mutex::new(HashMap::new()),
        }
    }

    /// The model table: every recognized language maps to a reader spec.
    /// Arabic checkpoints also cover Latin digits, so the mixed selection
    /// shares the Arabic recognition stack.
    fn reader_spec(language: Language) -> ReaderSpec {
        let detection = ModelSource::new(
            format!("{MODEL_BASE}/PP-OCRv4/ch_PP-OCRv4_det_infer.onnx"),
            "text_det.onnx",
        );
        let (recognition, dictionary) = match language {
            Language::Arabic | Language::Both => (
                ModelSource::new(
                    format!("{MODEL_BASE}/PP-OCRv3/arabic_PP-OCRv3_rec_infer.onnx"),
                    "rec_arabic.onnx",
                ),
                ModelSource::new(
                    format!("{MODEL_BASE}/dicts/arabic_dict.txt"),
                    "dict_arabic.txt",
                ),
            ),
            Language::French => (
                ModelSource::new(
                    format!("{MODEL_BASE}/PP-OCRv3/latin_PP-OCRv3_rec_infer.onnx"),
                    "rec_latin.onnx",
                ),
                ModelSource::new(
                    format!("{MODEL_BASE}/dicts/latin_dict.txt"),
                    "dict_latin.txt",
                ),
            ),
        };
        ReaderSpec {
            detection,
            recognition,
            dictionary,
            orientation: None,
        }
    }

    fn reader_for(&self, language: Language) -> Result<Arc<OnnxTextReader>, OCRError> {
        let mut readers = self
            .readers
            .lock()
            .map_err(|_| OCRError::engine_runtime_msg(ENGINE_NAME, "reader cache lock poisoned"))?;
        if let Some(reader) = readers.get(&language) {
            return Ok(Arc::clone(reader));
        }

        info!(language = %language, "building reader (first use for this language selection)");
        let reader = Arc::new(OnnxTextReader::from_spec(
            &Self::reader_spec(language),
            self.acceleration,
            self.session_config.as_ref(),
            &self.model_dir,
            self.allow_download,
        )?);
        readers.insert(language, Arc::clone(&reader));
        Ok(reader)
    }
}

impl OcrEngine for EasyOcrEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    /// Extracts text. `preprocess` is ignored: the reading stack performs
    /// its own input normalization and external binarization hurts the
    /// detection model.
    fn extract_text(
        &self,
        image: &DynamicImage,
        language: Language,
        _preprocess: bool,
    ) -> Result<String, OCRError> {
        let reader = self.reader_for(language)?;
        let detections = reader.read_text(&image.to_rgb8())?;
        Ok(join_detections(&detections, CONFIDENCE_THRESHOLD, LINE_GAP))
    }
}

/// Joins detections into text: detections below `confidence_threshold`
/// are dropped; a qualifying detection whose top-left y differs from the
/// previous qualifying one by more than `line_gap` starts a new line,
/// otherwise it is appended directly with no separator.
pub(crate) fn join_detections(
    detections: &[TextDetection],
    confidence_threshold: f32,
    line_gap: f32,
) -> String {
    let mut text = String::new();
    let mut previous_y: Option<f32> = None;

    for detection in detections {
        if detection.confidence <= confidence_threshold {
            continue;
        }
        if let Some(prev) = previous_y {
            if (detection.top_left_y() - prev).abs() > line_gap {
                text.push('\n');
            }
        }
        text.push_str(&detection.text);
        previous_y = Some(detection.top_left_y());
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(text: &str, y: f32, confidence: f32) -> TextDetection {
        TextDetection {
            polygon: [(0.0, y), (50.0, y), (50.0, y + 12.0), (0.0, y + 12.0)],
            text: text.to_string(),
            confidence,
        }
    }

    #[test]
    fn small_gaps_concatenate_and_large_gaps_break_lines() {
        let detections = [
            detection("mar", 10.0, 0.9),
            detection("haba", 12.0, 0.9),
            detection("bonjour", 40.0, 0.9),
        ];
        assert_eq!(join_detections(&detections, 0.3, 15.0), "marhaba\nbonjour");
    }

    #[test]
    fn low_confidence_detections_are_excluded() {
        let detections = [detection("bruit", 10.0, 0.05)];
        assert_eq!(join_detections(&detections, 0.3, 15.0), "");
    }

    #[test]
    fn excluded_detections_do_not_anchor_the_gap_comparison() {
        // The noise row at y=25 is dropped; the gap is measured between
        // the two qualifying detections (30 > 15), so a break is kept.
        let detections = [
            detection("un", 10.0, 0.9),
            detection("bruit", 25.0, 0.1),
            detection("deux", 40.0, 0.9),
        ];
        assert_eq!(join_detections(&detections, 0.3, 15.0), "un\ndeux");
    }

    #[test]
    fn every_language_has_a_reader_spec() {
        for language in [Language::Arabic, Language::French, Language::Both] {
            let spec = EasyOcrEngine::reader_spec(language);
            assert!(!spec.detection.url.is_empty());
            assert!(!spec.recognition.file_name.is_empty());
            assert!(spec.orientation.is_none());
        }
    }
}
