//! The line-level neural engine.
//!
//! One reading stack is built eagerly at engine construction and serves
//! every language selection. Construction tries the resolved
//! acceleration first and retries once on a CPU-only configuration; when
//! both fail the engine surfaces a fatal initialization error rather
//! than limping along.

use crate::backends::{ModelSource, OnnxTextReader, ReaderSpec, TextDetection};
use crate::core::{OCRError, OcrConfig, ResolvedAcceleration};
use crate::engines::{Language, OcrEngine};
use image::DynamicImage;
use tracing::{debug, warn};

const ENGINE_NAME: &str = "paddleocr";

/// Detections below this confidence are discarded. This backend's
/// confidence scale is looser than the word-level engine's; the two
/// thresholds are not comparable.
const CONFIDENCE_THRESHOLD: f32 = 0.1;

const MODEL_BASE: &str = "https://huggingface.co/SWHL/RapidOCR/resolve/main";

/// Line-level neural OCR with built-in orientation classification.
pub struct PaddleOcrEngine {
    reader: OnnxTextReader,
}

impl PaddleOcrEngine {
    /// Builds the engine, loading all models up front.
    ///
    /// # Errors
    ///
    /// Returns [`OCRError::EngineInit`] when neither the accelerated nor
    /// the CPU-only configuration could be constructed.
    pub fn new(config: &OcrConfig) -> Result<Self, OCRError> {
        let acceleration = config.acceleration.resolve();
        let spec = Self::reader_spec();
        let build = |accel: ResolvedAcceleration| {
            OnnxTextReader::from_spec(
                &spec,
                accel,
                config.ort_session.as_ref(),
                &config.model_dir,
                config.allow_download,
            )
        };

        let reader = match build(acceleration) {
            Ok(reader) => reader,
            Err(err) if acceleration != ResolvedAcceleration::Cpu => {
                warn!(
                    error = %err,
                    "accelerated initialization failed, retrying with CPU-only configuration"
                );
                build(ResolvedAcceleration::Cpu).map_err(|cpu_err| {
                    OCRError::engine_init(
                        ENGINE_NAME,
                        format!("accelerated initialization failed ({err}), CPU fallback also failed"),
                        Some(cpu_err),
                    )
                })?
            }
            Err(err) => {
                return Err(OCRError::engine_init(
                    ENGINE_NAME,
                    "CPU initialization failed",
                    Some(err),
                ));
            }
        };
        Ok(Self { reader })
    }

    /// The single multilingual model stack shared by every language
    /// selection. The Arabic recognition checkpoint also covers Latin
    /// digits and basic Latin letters, which keeps mixed documents
    /// readable without a per-language reader.
    fn reader_spec() -> ReaderSpec {
        ReaderSpec {
            detection: ModelSource::new(
                format!("{MODEL_BASE}/PP-OCRv4/ch_PP-OCRv4_det_infer.onnx"),
                "text_det.onnx",
            ),
            recognition: ModelSource::new(
                format!("{MODEL_BASE}/PP-OCRv3/arabic_PP-OCRv3_rec_infer.onnx"),
                "rec_arabic.onnx",
            ),
            dictionary: ModelSource::new(
                format!("{MODEL_BASE}/dicts/arabic_dict.txt"),
                "dict_arabic.txt",
            ),
            orientation: Some(ModelSource::new(
                format!("{MODEL_BASE}/PP-OCRv2/ch_ppocr_mobile_v2.0_cls_infer.onnx"),
                "text_cls.onnx",
            )),
        }
    }

    /// The adapter's language-code table; used for diagnostics since the
    /// single model stack serves every selection.
    fn lang_code(language: Language) -> &'static str {
        match language {
            Language::Arabic => "ar",
            Language::French => "fr",
            Language::Both => "ar+fr",
        }
    }
}

impl OcrEngine for PaddleOcrEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    /// Extracts text. `preprocess` is ignored: the stack normalizes its
    /// own input and classifies crop orientation internally.
    fn extract_text(
        &self,
        image: &DynamicImage,
        language: Language,
        _preprocess: bool,
    ) -> Result<String, OCRError> {
        debug!(
            language = %language,
            code = Self::lang_code(language),
            "line-level extraction"
        );
        let detections = self.reader.read_text(&image.to_rgb8())?;
        Ok(join_lines(&detections, CONFIDENCE_THRESHOLD))
    }
}

/// Joins line detections with newlines, dropping those at or below
/// `confidence_threshold`. Line ordering is preserved as reported.
fn join_lines(detections: &[TextDetection], confidence_threshold: f32) -> String {
    detections
        .iter()
        .filter(|d| d.confidence > confidence_threshold)
        .map(|d| d.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(text: &str, confidence: f32) -> TextDetection {
        TextDetection {
            polygon: [(0.0, 0.0), (80.0, 0.0), (80.0, 14.0), (0.0, 14.0)],
            text: text.to_string(),
            confidence,
        }
    }

    #[test]
    fn lines_join_with_newlines_in_reported_order() {
        let detections = [detection("premiere ligne", 0.8), detection("deuxieme", 0.7)];
        assert_eq!(join_lines(&detections, 0.1), "premiere ligne\ndeuxieme");
    }

    #[test]
    fn permissive_threshold_keeps_low_confidence_lines() {
        // 0.15 clears this backend's 0.1 threshold but would be dropped
        // by the word-level engine's 0.3.
        let detections = [detection("faible", 0.15)];
        assert_eq!(join_lines(&detections, 0.1), "faible");
        assert_eq!(super::super::easyocr::join_detections(&detections, 0.3, 15.0), "");
    }

    #[test]
    fn nothing_qualifying_yields_an_empty_string() {
        let detections = [detection("bruit", 0.05)];
        assert_eq!(join_lines(&detections, 0.1), "");
    }

    #[test]
    fn every_language_has_a_code() {
        assert_eq!(PaddleOcrEngine::lang_code(Language::Arabic), "ar");
        assert_eq!(PaddleOcrEngine::lang_code(Language::French), "fr");
        assert_eq!(PaddleOcrEngine::lang_code(Language::Both), "ar+fr");
    }
}
