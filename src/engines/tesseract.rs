//! The classical engine, backed by a system Tesseract installation.
//!
//! Construction is cheap and cannot fail: a fresh Tesseract handle is
//! created per extraction call (the handle is a consuming builder, so
//! sharing one across calls would serialize everything anyway). Language
//! packs are addressed by their `ara`/`fra` traineddata codes; the
//! bilingual case stacks both with `ara+fra`.

use crate::core::{OCRError, OcrConfig};
use crate::engines::{Language, OcrEngine};
use crate::processors::{PreprocessConfig, preprocess_image};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tesseract::{PageSegMode, Tesseract};
use tracing::{debug, warn};

const ENGINE_NAME: &str = "tesseract";

/// Classical OCR via Tesseract language packs.
pub struct TesseractEngine {
    datapath: Option<String>,
}

impl TesseractEngine {
    /// Creates the engine. `tessdata_path` in the config overrides the
    /// system default traineddata location.
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            datapath: config.tessdata_path.clone(),
        }
    }

    /// Maps a language selection onto Tesseract traineddata codes.
    fn lang_code(language: Language) -> &'static str {
        match language {
            Language::Arabic => "ara",
            Language::French => "fra",
            Language::Both => "ara+fra",
        }
    }

    /// Lists the traineddata languages the local installation can load.
    ///
    /// Enumeration failures are reported as an empty list rather than an
    /// error; callers use this for diagnostics, not for gating.
    pub fn available_languages(&self) -> Vec<String> {
        match tesseract::list_tesseract_languages() {
            Ok(languages) => languages,
            Err(err) => {
                warn!(error = %err, "failed to enumerate installed tesseract languages");
                Vec::new()
            }
        }
    }

    /// Extracts text along with the mean word confidence in `[0, 100]`
    /// (0.0 when no words were found).
    pub fn extract_text_with_confidence(
        &self,
        image: &DynamicImage,
        language: Language,
        preprocess: bool,
    ) -> Result<(String, f32), OCRError> {
        let mut handle = self.prepare(image, language, preprocess)?;
        let tsv = handle
            .get_tsv_text(0)
            .map_err(|e| OCRError::engine_runtime(ENGINE_NAME, "tsv extraction failed", e))?;
        Ok(parse_tsv(&tsv))
    }

    fn prepare(
        &self,
        image: &DynamicImage,
        language: Language,
        preprocess: bool,
    ) -> Result<Tesseract, OCRError> {
        let code = Self::lang_code(language);
        debug!(language = %language, code, preprocess, "classical extraction");

        let prepared = if preprocess {
            preprocess_image(image, PreprocessConfig::default())?
        } else {
            image.clone()
        };
        let png = encode_png(&prepared)?;

        let handle = Tesseract::new(self.datapath.as_deref(), Some(code)).map_err(|e| {
            OCRError::engine_runtime(
                ENGINE_NAME,
                format!("initialization with languages '{code}' failed (are the '{code}' traineddata files installed?)"),
                e,
            )
        })?;
        let mut handle = handle
            .set_image_from_mem(&png)
            .map_err(|e| OCRError::engine_runtime(ENGINE_NAME, "failed to set image", e))?;
        handle.set_page_seg_mode(PageSegMode::PsmAuto);
        Ok(handle)
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    fn extract_text(
        &self,
        image: &DynamicImage,
        language: Language,
        preprocess: bool,
    ) -> Result<String, OCRError> {
        let mut handle = self.prepare(image, language, preprocess)?;
        let text = handle
            .get_text()
            .map_err(|e| OCRError::engine_runtime(ENGINE_NAME, "text extraction failed", e))?;
        Ok(text.trim().to_string())
    }
}

/// Encodes an image as PNG so it can be handed to Tesseract in memory.
fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, OCRError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(OCRError::ImageLoad)?;
    Ok(buffer.into_inner())
}

/// Parses Tesseract TSV output into joined text and a mean confidence.
///
/// Word rows carry the confidence in column 10 and the text in column 11;
/// structural rows (pages, blocks, lines) carry the sentinel -1 and are
/// skipped, as are empty word cells.
fn parse_tsv(tsv: &str) -> (String, f32) {
    let mut words: Vec<&str> = Vec::new();
    let mut confidences: Vec<f32> = Vec::new();

    for line in tsv.lines() {
        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() < 12 {
            continue;
        }
        // The header line fails this parse and is skipped with it.
        let Ok(confidence) = columns[10].parse::<f32>() else {
            continue;
        };
        if confidence < 0.0 {
            continue;
        }
        let word = columns[11].trim();
        if word.is_empty() {
            continue;
        }
        words.push(word);
        confidences.push(confidence);
    }

    let text = words.join(" ");
    let confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f32>() / confidences.len() as f32
    };
    (text, confidence)
}
